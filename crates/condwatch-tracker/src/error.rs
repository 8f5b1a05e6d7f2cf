//! 추적 에러 타입.

use condwatch_broker::BrokerError;
use condwatch_core::WatchError;
use thiserror::Error;

/// 추적 관련 에러.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// 화면에 이미 활성 구독이 있음
    #[error("Screen busy: {screen} is already tracking {condition}")]
    ScreenBusy { screen: String, condition: String },

    /// 같은 조건식이 다른 화면에서 이미 활성 구독 중
    #[error("Condition busy: {condition} is already active on screen {screen}")]
    ConditionBusy { screen: String, condition: String },

    /// 브로커가 조건검색 요청을 거부함
    #[error("Subscription rejected: {condition} on screen {screen}")]
    SubscriptionRejected { screen: String, condition: String },

    /// 활성 구독이 없음
    #[error("No active subscription on screen {0}")]
    NotActive(String),

    /// 조건식 목록에 없는 조건식
    #[error("Unknown condition: {0}")]
    UnknownCondition(String),

    /// 로그인 전 요청
    #[error("Not connected: {0}")]
    NotConnected(String),

    /// 잘못된 입력
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 시간 초과
    #[error("Timeout: {0}")]
    Timeout(String),

    /// 싱크 에러 (명시적 flush에서만 반환)
    #[error("Sink error: {0}")]
    Sink(#[from] WatchError),

    /// 브로커 에러
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    /// 모니터 태스크가 종료됨
    #[error("Monitor stopped")]
    MonitorStopped,
}

/// 추적 작업을 위한 Result 타입.
pub type TrackerResult<T> = Result<T, TrackerError>;

impl TrackerError {
    /// 같은 요청을 나중에 다시 시도할 수 있는지 확인.
    pub fn is_retryable(&self) -> bool {
        match self {
            TrackerError::SubscriptionRejected { .. } | TrackerError::Timeout(_) => true,
            TrackerError::Broker(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        let rejected = TrackerError::SubscriptionRejected {
            screen: "100".into(),
            condition: "급등주".into(),
        };
        assert!(rejected.is_retryable());
        assert!(!TrackerError::UnknownCondition("x".into()).is_retryable());
        assert!(TrackerError::from(BrokerError::Timeout("ack".into())).is_retryable());
    }

    #[test]
    fn test_display() {
        let busy = TrackerError::ScreenBusy {
            screen: "100".into(),
            condition: "급등주".into(),
        };
        assert_eq!(busy.to_string(), "Screen busy: 100 is already tracking 급등주");

        let busy = TrackerError::ConditionBusy {
            screen: "100".into(),
            condition: "급등주".into(),
        };
        assert_eq!(busy.to_string(), "Condition busy: 급등주 is already active on screen 100");
        assert!(!busy.is_retryable());
    }
}
