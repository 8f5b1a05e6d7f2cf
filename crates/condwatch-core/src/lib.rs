//! # Condwatch Core
//!
//! 조건검색 실시간 감시 시스템의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 종목코드 및 화면번호 타입
//! - 세션 연결 상태
//! - 조건식 카탈로그와 구독
//! - 편입/이탈 이벤트 및 추적 종목
//! - 저장/표시 싱크 계약
//! - 시계 추상화
//! - 설정 관리
//! - 로깅 인프라

pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use clock::*;
pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
