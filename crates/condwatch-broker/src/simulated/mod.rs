//! 시뮬레이션 브로커.
//!
//! 실제 브로커 컨트롤 없이 로그인, 조건식 목록, 조건검색 승인,
//! 편입/이탈 이벤트를 스크립트대로 재생합니다.

mod broker;
mod script;

pub use broker::{SimulatedBroker, SimulatedCommand};
pub use script::{AckPolicy, ScriptedCondition, ScriptedEvent, ScriptedMarketStatus, SimulationScript};
