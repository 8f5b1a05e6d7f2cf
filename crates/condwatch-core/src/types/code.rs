//! 종목코드 타입.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::WatchError;

/// 종목코드 최대 길이 (ETN 등 접두 문자 포함).
const MAX_CODE_LEN: usize = 12;

/// 브로커가 부여한 종목코드 (예: "005930").
///
/// 영숫자만 허용하며 앞뒤 공백은 제거합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StockCode(String);

impl StockCode {
    /// 문자열을 검증해 종목코드를 생성합니다.
    pub fn parse(raw: &str) -> Result<Self, WatchError> {
        let code = raw.trim();
        if code.is_empty() {
            return Err(WatchError::InvalidInput("빈 종목코드".to_string()));
        }
        if code.len() > MAX_CODE_LEN || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(WatchError::InvalidInput(format!("잘못된 종목코드: {:?}", raw)));
        }
        Ok(Self(code.to_uppercase()))
    }

    /// 코드 문자열.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StockCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StockCode {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StockCode {
    type Error = WatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StockCode> for String {
    fn from(code: StockCode) -> Self {
        code.0
    }
}

impl AsRef<str> for StockCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_whitespace() {
        let code = StockCode::parse(" 005930 ").unwrap();
        assert_eq!(code.as_str(), "005930");
    }

    #[test]
    fn test_reject_malformed() {
        assert!(StockCode::parse("").is_err());
        assert!(StockCode::parse("   ").is_err());
        assert!(StockCode::parse("005;930").is_err());
        assert!(StockCode::parse("0123456789ABC").is_err());
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let code: StockCode = serde_json::from_str("\"q500001\"").unwrap();
        assert_eq!(code.as_str(), "Q500001");
        assert!(serde_json::from_str::<StockCode>("\"bad code\"").is_err());
    }
}
