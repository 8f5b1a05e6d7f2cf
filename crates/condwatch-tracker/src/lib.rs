//! 조건검색 구독 추적.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - ConnectionManager: 브로커 세션 로그인 수명주기
//! - CatalogLoader: 조건식 목록 로드
//! - MembershipSet: 편입 순서를 유지하는 추적 종목 집합
//! - ConditionTracker: 화면 하나의 조건검색 구독과 이벤트 적용
//! - ConditionMonitor: 브로커 이벤트와 호출자 명령을 처리하는 단일 소비 루프
//! - 기본 싱크 구현과 처리 통계

pub mod catalog;
pub mod connection;
pub mod error;
pub mod membership;
pub mod monitor;
pub mod sinks;
pub mod stats;
pub mod tracker;

pub use catalog::{CatalogLoader, CatalogStatus};
pub use connection::ConnectionManager;
pub use error::*;
pub use membership::{MembershipSet, MembershipView};
pub use monitor::{ConditionMonitor, MonitorCommand, MonitorHandle, MonitorReport};
pub use sinks::{LogPresentationSink, MemorySink, NoopPersistenceSink};
pub use stats::TrackerStats;
pub use tracker::{ConditionTracker, EventOutcome, TrackerContext, TrackerOptions};
