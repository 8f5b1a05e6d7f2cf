//! 장운영 구분.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 브로커가 실시간으로 알려주는 장운영 구분 값.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketPhase {
    /// 장 시작 전 ("0")
    PreOpen,
    /// 장 종료, 시간외 매매 시작 ("2")
    AfterHoursOpen,
    /// 시간외 매매 종료 ("3")
    AfterHoursClosed,
    /// 그 밖의 값 (원문 보존)
    Other(String),
}

impl MarketPhase {
    /// 원시 값에서 변환합니다.
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim() {
            "0" => MarketPhase::PreOpen,
            "2" => MarketPhase::AfterHoursOpen,
            "3" => MarketPhase::AfterHoursClosed,
            other => MarketPhase::Other(other.to_string()),
        }
    }
}

impl fmt::Display for MarketPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketPhase::PreOpen => write!(f, "장 시작 전"),
            MarketPhase::AfterHoursOpen => write!(f, "장 종료, 시간외 매매 시작"),
            MarketPhase::AfterHoursClosed => write!(f, "시간외 매매 종료"),
            MarketPhase::Other(raw) => write!(f, "장운영 구분 {}", raw),
        }
    }
}
