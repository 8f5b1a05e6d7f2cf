//! 조건검색 추적 목록 저장소.
//!
//! 세션 날짜와 조건식 이름마다 SQLite 파일 하나에 현재 추적 목록을 기록합니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use condwatch_storage::{SessionStore, SqlitePersistenceSink};
//!
//! let sink = SqlitePersistenceSink::from_settings(&config.storage);
//! let rows = SessionStore::open("data/20240715_급등주.db").await?.read_all().await?;
//! ```

pub mod error;
pub mod sqlite;

pub use error::{Result, StorageError};
pub use sqlite::{sanitize_condition_name, session_file_name, SessionStore, SqlitePersistenceSink};
