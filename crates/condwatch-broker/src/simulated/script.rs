//! 시뮬레이션 스크립트.
//!
//! ```json
//! {
//!   "login_code": 0,
//!   "login_delay_ms": 100,
//!   "conditions": [
//!     {
//!       "index": 0,
//!       "name": "급등주",
//!       "initial": ["005930"],
//!       "events": [
//!         { "delay_ms": 500, "code": "000660", "kind": "I" },
//!         { "delay_ms": 500, "code": "005930", "kind": "D" }
//!       ]
//!     }
//!   ],
//!   "market_status": [{ "delay_ms": 0, "value": "0" }]
//! }
//! ```

use condwatch_core::{ConditionEvent, ConditionInfo, StockCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{BrokerError, BrokerResult};

fn default_login_code() -> Option<i32> {
    Some(0)
}

fn default_catalog_result() -> i32 {
    1
}

fn default_accept() -> bool {
    true
}

/// 조건검색 요청 승인 정책.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckPolicy {
    /// 조건식 항목의 `accept` 값을 따름
    #[default]
    PerCondition,
    /// 모두 승인
    AcceptAll,
    /// 모두 거부
    RejectAll,
}

/// 재생할 편입/이탈 이벤트.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedEvent {
    /// 직전 이벤트로부터의 지연 (밀리초)
    #[serde(default)]
    pub delay_ms: u64,
    /// 종목코드
    pub code: String,
    /// "I" 또는 "D"
    pub kind: String,
}

impl ScriptedEvent {
    pub fn new(delay_ms: u64, code: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            delay_ms,
            code: code.into(),
            kind: kind.into(),
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// 조건식에 묶인 이벤트로 변환합니다.
    pub fn to_event(&self, condition: &ConditionInfo) -> BrokerResult<ConditionEvent> {
        ConditionEvent::from_raw(
            &self.code,
            &self.kind,
            &condition.name,
            &condition.index.to_string(),
        )
        .map_err(|e| BrokerError::Script(e.to_string()))
    }
}

/// 스크립트의 조건식 항목.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedCondition {
    pub index: i32,
    pub name: String,
    /// 조건검색 요청 승인 여부
    #[serde(default = "default_accept")]
    pub accept: bool,
    /// 승인 직후 편입으로 전달할 종목 (일반/실시간 조회 공통)
    #[serde(default)]
    pub initial: Vec<String>,
    /// 실시간 조회에서만 재생할 이벤트
    #[serde(default)]
    pub events: Vec<ScriptedEvent>,
}

impl ScriptedCondition {
    pub fn new(index: i32, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            accept: true,
            initial: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn with_initial<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.initial.extend(codes.into_iter().map(Into::into));
        self
    }

    pub fn with_events(mut self, events: Vec<ScriptedEvent>) -> Self {
        self.events.extend(events);
        self
    }

    pub fn rejected(mut self) -> Self {
        self.accept = false;
        self
    }

    pub fn info(&self) -> ConditionInfo {
        ConditionInfo::new(self.index, self.name.clone())
    }
}

/// 로그인 이후 재생할 장운영 구분.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedMarketStatus {
    #[serde(default)]
    pub delay_ms: u64,
    pub value: String,
}

/// 시뮬레이션 스크립트.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationScript {
    /// 로그인 결과 코드. `null`이면 응답하지 않음
    #[serde(default = "default_login_code")]
    pub login_code: Option<i32>,
    /// 로그인 응답 지연 (밀리초)
    #[serde(default)]
    pub login_delay_ms: u64,
    /// 조건식 목록 로드 결과 코드
    #[serde(default = "default_catalog_result")]
    pub catalog_result: i32,
    /// 승인 정책
    #[serde(default)]
    pub ack_policy: AckPolicy,
    #[serde(default)]
    pub conditions: Vec<ScriptedCondition>,
    #[serde(default)]
    pub market_status: Vec<ScriptedMarketStatus>,
}

impl Default for SimulationScript {
    fn default() -> Self {
        Self {
            login_code: default_login_code(),
            login_delay_ms: 0,
            catalog_result: default_catalog_result(),
            ack_policy: AckPolicy::default(),
            conditions: Vec::new(),
            market_status: Vec::new(),
        }
    }
}

impl SimulationScript {
    /// JSON 문자열에서 로드합니다.
    pub fn from_json_str(json: &str) -> BrokerResult<Self> {
        let script: Self = serde_json::from_str(json)?;
        script.validate()?;
        Ok(script)
    }

    /// JSON 파일에서 로드합니다.
    pub fn from_json_file(path: impl AsRef<Path>) -> BrokerResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            BrokerError::Script(format!("스크립트 파일 읽기 실패 {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn with_login_code(mut self, code: Option<i32>) -> Self {
        self.login_code = code;
        self
    }

    pub fn with_login_delay(mut self, delay: Duration) -> Self {
        self.login_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_ack_policy(mut self, policy: AckPolicy) -> Self {
        self.ack_policy = policy;
        self
    }

    pub fn with_condition(mut self, condition: ScriptedCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn login_delay(&self) -> Duration {
        Duration::from_millis(self.login_delay_ms)
    }

    /// 조건식 목록.
    pub fn catalog(&self) -> Vec<ConditionInfo> {
        self.conditions.iter().map(ScriptedCondition::info).collect()
    }

    pub fn find(&self, name: &str, index: i32) -> Option<&ScriptedCondition> {
        self.conditions
            .iter()
            .find(|c| c.name == name && c.index == index)
    }

    /// 종목코드와 이벤트 구분을 미리 검사합니다.
    pub fn validate(&self) -> BrokerResult<()> {
        for condition in &self.conditions {
            let info = condition.info();
            for code in &condition.initial {
                StockCode::parse(code).map_err(|e| {
                    BrokerError::Script(format!("{}: {}", condition.name, e))
                })?;
            }
            for event in &condition.events {
                event.to_event(&info)?;
            }
        }
        Ok(())
    }
}
