//! 브로커 연동.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - BrokerApi trait: 조건검색 브로커 인터페이스
//! - 브리지 클라이언트: 브로커 컨트롤을 호스팅하는 외부 어댑터와 WebSocket 연동
//! - 시뮬레이션 브로커 (테스트 및 스크립트 재생용)
//! - 표준시 서버 시각 동기화

pub mod bridge;
pub mod error;
pub mod simulated;
pub mod time_sync;
pub mod traits;

pub use bridge::{BridgeBroker, BridgeCommand, BridgeConfig, BridgeMessage};
pub use error::*;
pub use simulated::{
    AckPolicy, ScriptedCondition, ScriptedEvent, ScriptedMarketStatus, SimulatedBroker,
    SimulatedCommand, SimulationScript,
};
pub use time_sync::KrissTimeSync;
pub use traits::*;
