//! 도메인 모델.
//!
//! - `session`: 브로커 세션 연결 상태
//! - `condition`: 조건식 카탈로그와 구독
//! - `event`: 실시간 편입/이탈 이벤트
//! - `tracked`: 추적 중인 종목
//! - `market`: 장운영 구분
//! - `sink`: 저장/표시 협력자 계약

pub mod condition;
pub mod event;
pub mod market;
pub mod session;
pub mod sink;
pub mod tracked;

pub use condition::*;
pub use event::*;
pub use market::*;
pub use session::*;
pub use sink::*;
pub use tracked::*;
