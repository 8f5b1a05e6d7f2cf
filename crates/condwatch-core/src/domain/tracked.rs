//! 추적 중인 종목.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clock::TIMESTAMP_FORMAT;
use crate::types::StockCode;

/// 조건식을 만족해 추적 중인 종목.
///
/// `first_seen`은 처음 편입된 시각이며 중복 편입으로 바뀌지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedStock {
    pub code: StockCode,
    pub first_seen: NaiveDateTime,
    pub condition_name: String,
}

impl TrackedStock {
    pub fn new(code: StockCode, first_seen: NaiveDateTime, condition_name: impl Into<String>) -> Self {
        Self {
            code,
            first_seen,
            condition_name: condition_name.into(),
        }
    }

    /// `YYYY-MM-DD HH:MM:SS` 형식의 최초 포착 시각.
    pub fn first_seen_display(&self) -> String {
        self.first_seen.format(TIMESTAMP_FORMAT).to_string()
    }
}

impl fmt::Display for TrackedStock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}  {}  {}",
            self.code,
            self.first_seen_display(),
            self.condition_name
        )
    }
}
