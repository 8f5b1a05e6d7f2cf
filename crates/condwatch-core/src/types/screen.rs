//! 화면번호 타입.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::WatchError;

/// 구독 범위를 지정하는 화면번호 (숫자 1~4자리).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScreenId(String);

impl ScreenId {
    /// 문자열을 검증해 화면번호를 생성합니다.
    pub fn parse(raw: &str) -> Result<Self, WatchError> {
        let screen = raw.trim();
        if screen.is_empty() || screen.len() > 4 || !screen.chars().all(|c| c.is_ascii_digit()) {
            return Err(WatchError::InvalidInput(format!("잘못된 화면번호: {:?}", raw)));
        }
        Ok(Self(screen.to_string()))
    }

    /// 화면번호 문자열.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ScreenId {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ScreenId {
    type Error = WatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ScreenId> for String {
    fn from(screen: ScreenId) -> Self {
        screen.0
    }
}
