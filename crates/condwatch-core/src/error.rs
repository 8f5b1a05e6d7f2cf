//! 조건 감시 시스템의 에러 타입.
//!
//! 이 모듈은 크레이트 경계를 넘어 공유되는 에러 타입을 정의합니다.

use thiserror::Error;

/// 핵심 에러.
#[derive(Debug, Error)]
pub enum WatchError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 브로커 연동 에러
    #[error("브로커 에러: {0}")]
    Broker(String),

    /// 조건식 구독 에러
    #[error("구독 에러: {0}")]
    Subscription(String),

    /// 저장소 에러
    #[error("저장소 에러: {0}")]
    Storage(String),

    /// 프로토콜 위반 (예상하지 못한 콜백, 잘못된 페이로드)
    #[error("프로토콜 위반: {0}")]
    Protocol(String),

    /// 시간 초과
    #[error("시간 초과: {0}")]
    Timeout(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 핵심 작업을 위한 Result 타입.
pub type WatchResult<T> = Result<T, WatchError>;

impl WatchError {
    /// 호출자가 다시 시도해 볼 수 있는 에러인지 확인합니다.
    ///
    /// 자동 재시도는 하지 않습니다. 상태 표시와 수동 재시도 판단에만 사용합니다.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WatchError::Broker(_) | WatchError::Subscription(_) | WatchError::Timeout(_)
        )
    }

    /// 외부 입력 이상으로 버려도 되는 에러인지 확인합니다.
    pub fn is_anomaly(&self) -> bool {
        matches!(self, WatchError::Protocol(_) | WatchError::InvalidInput(_))
    }
}

impl From<serde_json::Error> for WatchError {
    fn from(err: serde_json::Error) -> Self {
        WatchError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for WatchError {
    fn from(err: config::ConfigError) -> Self {
        WatchError::Config(err.to_string())
    }
}
