//! 조건식 카탈로그와 구독.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::WatchError;
use crate::types::ScreenId;

/// 조건식 목록 로드 성공을 나타내는 결과 코드.
pub const CATALOG_LOAD_SUCCESS: i32 = 1;

/// 조건검색 조회 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// 일반 조회 (현재 만족 종목만 한 번 전달)
    Snapshot,
    /// 실시간 조회 (편입/이탈 이벤트 계속 전달)
    #[default]
    Live,
}

impl SearchMode {
    /// 브로커에 전달하는 숫자 코드.
    pub fn as_code(&self) -> i32 {
        match self {
            SearchMode::Snapshot => 0,
            SearchMode::Live => 1,
        }
    }

    /// 숫자 코드에서 변환합니다.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(SearchMode::Snapshot),
            1 => Some(SearchMode::Live),
            _ => None,
        }
    }

    /// 실시간 이벤트를 계속 받는 방식인지 확인합니다.
    pub fn is_live(&self) -> bool {
        matches!(self, SearchMode::Live)
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Snapshot => write!(f, "snapshot"),
            SearchMode::Live => write!(f, "live"),
        }
    }
}

impl FromStr for SearchMode {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "snapshot" | "0" => Ok(SearchMode::Snapshot),
            "live" | "1" => Ok(SearchMode::Live),
            other => Err(WatchError::InvalidInput(format!("알 수 없는 조회 방식: {}", other))),
        }
    }
}

/// 조건식 카탈로그 항목.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionInfo {
    /// 브로커가 부여한 조건식 인덱스
    pub index: i32,
    /// 조건식 이름
    pub name: String,
}

impl ConditionInfo {
    pub fn new(index: i32, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }
}

impl fmt::Display for ConditionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}^{}", self.index, self.name)
    }
}

/// `"000^이름;001^이름2;"` 형식의 조건식 목록을 파싱합니다.
///
/// 빈 항목은 건너뛰고, 인덱스가 숫자가 아니거나 이름이 빈 항목은 에러입니다.
pub fn parse_condition_list(raw: &str) -> Result<Vec<ConditionInfo>, WatchError> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (index, name) = entry.split_once('^').ok_or_else(|| {
                WatchError::Protocol(format!("조건식 항목에 '^' 없음: {:?}", entry))
            })?;
            let index = index.trim().parse::<i32>().map_err(|e| {
                WatchError::Protocol(format!("조건식 인덱스 오류 {:?}: {}", entry, e))
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(WatchError::Protocol(format!("조건식 이름 없음: {:?}", entry)));
            }
            Ok(ConditionInfo::new(index, name))
        })
        .collect()
}

/// 로드된 조건식 목록.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionCatalog {
    entries: Vec<ConditionInfo>,
}

impl ConditionCatalog {
    pub fn new(entries: Vec<ConditionInfo>) -> Self {
        Self { entries }
    }

    /// 원시 목록 문자열에서 생성합니다.
    pub fn parse(raw: &str) -> Result<Self, WatchError> {
        parse_condition_list(raw).map(Self::new)
    }

    /// 이름으로 조회합니다. 같은 이름이 여럿이면 첫 항목을 반환합니다.
    pub fn find_by_name(&self, name: &str) -> Option<&ConditionInfo> {
        self.entries.iter().find(|c| c.name == name)
    }

    /// 인덱스로 조회합니다.
    pub fn find_by_index(&self, index: i32) -> Option<&ConditionInfo> {
        self.entries.iter().find(|c| c.index == index)
    }

    pub fn entries(&self) -> &[ConditionInfo] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 구독 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    /// 요청 전
    #[default]
    Idle,
    /// 브로커 승인 후 이벤트 수신 중
    Active,
    /// 중지됨
    Stopped,
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionState::Idle => write!(f, "idle"),
            SubscriptionState::Active => write!(f, "active"),
            SubscriptionState::Stopped => write!(f, "stopped"),
        }
    }
}

/// 조건식 구독.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionSubscription {
    /// 조건식 이름
    pub condition_name: String,
    /// 조건식 인덱스
    pub condition_index: i32,
    /// 화면번호
    pub screen: ScreenId,
    /// 조회 방식
    pub mode: SearchMode,
    /// 구독 상태
    pub state: SubscriptionState,
    /// 승인 시각
    pub activated_at: Option<NaiveDateTime>,
}

impl ConditionSubscription {
    /// Idle 상태의 구독을 생성합니다.
    pub fn new(
        screen: ScreenId,
        condition_name: impl Into<String>,
        condition_index: i32,
        mode: SearchMode,
    ) -> Self {
        Self {
            condition_name: condition_name.into(),
            condition_index,
            screen,
            mode,
            state: SubscriptionState::Idle,
            activated_at: None,
        }
    }

    /// 이벤트의 (조건식 이름, 인덱스)가 이 구독과 일치하는지 확인합니다.
    pub fn matches(&self, condition_name: &str, condition_index: i32) -> bool {
        self.condition_name == condition_name && self.condition_index == condition_index
    }

    pub fn is_active(&self) -> bool {
        self.state == SubscriptionState::Active
    }
}

impl fmt::Display for ConditionSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] @ screen {} ({}, {})",
            self.condition_name, self.condition_index, self.screen, self.mode, self.state
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_mode_codes() {
        assert_eq!(SearchMode::Snapshot.as_code(), 0);
        assert_eq!(SearchMode::Live.as_code(), 1);
        assert_eq!(SearchMode::from_code(1), Some(SearchMode::Live));
        assert_eq!(SearchMode::from_code(2), None);
        assert_eq!("LIVE".parse::<SearchMode>().unwrap(), SearchMode::Live);
        assert_eq!("0".parse::<SearchMode>().unwrap(), SearchMode::Snapshot);
        assert!("realtime".parse::<SearchMode>().is_err());
    }

    #[test]
    fn test_parse_condition_list() {
        let list = parse_condition_list("000^급등주;001^거래량 급증;").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0], ConditionInfo::new(0, "급등주"));
        assert_eq!(list[1], ConditionInfo::new(1, "거래량 급증"));
    }

    #[test]
    fn test_parse_condition_list_empty_and_malformed() {
        assert!(parse_condition_list("").unwrap().is_empty());
        assert!(parse_condition_list(";;").unwrap().is_empty());
        assert!(parse_condition_list("abc^이름;").is_err());
        assert!(parse_condition_list("003;").is_err());
        assert!(parse_condition_list("003^;").is_err());
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = ConditionCatalog::parse("000^A;007^B;").unwrap();
        assert_eq!(catalog.find_by_name("B").map(|c| c.index), Some(7));
        assert_eq!(catalog.find_by_index(0).map(|c| c.name.as_str()), Some("A"));
        assert!(catalog.find_by_name("C").is_none());
    }

    #[test]
    fn test_subscription_matches() {
        let screen = ScreenId::parse("100").unwrap();
        let sub = ConditionSubscription::new(screen, "급등주", 3, SearchMode::Live);
        assert_eq!(sub.state, SubscriptionState::Idle);
        assert!(sub.matches("급등주", 3));
        assert!(!sub.matches("급등주", 4));
        assert!(!sub.matches("거래량", 3));
    }
}
