//! 실시간 조건검색 편입/이탈 이벤트.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::WatchError;
use crate::types::StockCode;

/// 이벤트 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionEventKind {
    /// 편입 ("I")
    Insert,
    /// 이탈 ("D")
    Delete,
}

impl ConditionEventKind {
    /// 브로커의 원시 구분 값("I"/"D")에서 변환합니다.
    pub fn from_raw(raw: &str) -> Result<Self, WatchError> {
        match raw.trim() {
            "I" => Ok(ConditionEventKind::Insert),
            "D" => Ok(ConditionEventKind::Delete),
            other => Err(WatchError::Protocol(format!("알 수 없는 이벤트 구분: {:?}", other))),
        }
    }

    pub fn as_raw(&self) -> &'static str {
        match self {
            ConditionEventKind::Insert => "I",
            ConditionEventKind::Delete => "D",
        }
    }
}

impl fmt::Display for ConditionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionEventKind::Insert => write!(f, "편입"),
            ConditionEventKind::Delete => write!(f, "이탈"),
        }
    }
}

/// 실시간 조건검색 이벤트.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionEvent {
    pub code: StockCode,
    pub kind: ConditionEventKind,
    pub condition_name: String,
    pub condition_index: i32,
}

impl ConditionEvent {
    pub fn new(
        code: StockCode,
        kind: ConditionEventKind,
        condition_name: impl Into<String>,
        condition_index: i32,
    ) -> Self {
        Self {
            code,
            kind,
            condition_name: condition_name.into(),
            condition_index,
        }
    }

    /// 편입 이벤트.
    pub fn insert(code: StockCode, condition_name: impl Into<String>, condition_index: i32) -> Self {
        Self::new(code, ConditionEventKind::Insert, condition_name, condition_index)
    }

    /// 이탈 이벤트.
    pub fn delete(code: StockCode, condition_name: impl Into<String>, condition_index: i32) -> Self {
        Self::new(code, ConditionEventKind::Delete, condition_name, condition_index)
    }

    /// 브로커 콜백의 원시 필드에서 이벤트를 만듭니다.
    ///
    /// 인덱스는 "003"처럼 0으로 채워진 문자열로 올 수 있습니다.
    pub fn from_raw(
        code: &str,
        kind: &str,
        condition_name: &str,
        condition_index: &str,
    ) -> Result<Self, WatchError> {
        let code = StockCode::parse(code)?;
        let kind = ConditionEventKind::from_raw(kind)?;
        let index = condition_index.trim().parse::<i32>().map_err(|e| {
            WatchError::Protocol(format!("조건식 인덱스 오류 {:?}: {}", condition_index, e))
        })?;
        Ok(Self::new(code, kind, condition_name.trim(), index))
    }
}

impl fmt::Display for ConditionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}[{}])",
            self.code, self.kind, self.condition_name, self.condition_index
        )
    }
}
