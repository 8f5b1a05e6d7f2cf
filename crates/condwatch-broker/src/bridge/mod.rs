//! 브리지 어댑터 연동.
//!
//! 브로커 컨트롤은 별도 프로세스(브리지 어댑터)가 호스팅하고, 이 모듈은
//! WebSocket 텍스트 프레임으로 어댑터와 통신합니다.

mod client;
mod protocol;

pub use client::{BridgeBroker, BridgeConfig};
pub use protocol::{BridgeCommand, BridgeMessage};
