//! 브로커 에러 타입.

use condwatch_core::WatchError;
use thiserror::Error;

/// 브로커 관련 에러.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    NetworkError(String),

    /// 브로커 연결 끊김
    #[error("Disconnected: {0}")]
    Disconnected(String),

    /// 연결 전 요청
    #[error("Not connected")]
    NotConnected,

    /// 프로토콜 위반 (알 수 없는 메시지, 잘못된 필드)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// WebSocket 에러
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 잘못된 요청 인자
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 시뮬레이션 스크립트 에러
    #[error("Script error: {0}")]
    Script(String),

    /// 시각 동기화 에러
    #[error("Time sync error: {0}")]
    TimeSync(String),
}

impl BrokerError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BrokerError::NetworkError(_)
                | BrokerError::Disconnected(_)
                | BrokerError::Timeout(_)
                | BrokerError::WebSocket(_)
        )
    }

    /// 연결이 없어서 실패한 에러인지 확인.
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            BrokerError::Disconnected(_) | BrokerError::NotConnected
        )
    }
}

impl From<reqwest::Error> for BrokerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BrokerError::Timeout(err.to_string())
        } else if err.is_connect() {
            BrokerError::NetworkError(err.to_string())
        } else {
            BrokerError::TimeSync(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BrokerError {
    fn from(err: serde_json::Error) -> Self {
        BrokerError::Script(err.to_string())
    }
}

impl From<std::io::Error> for BrokerError {
    fn from(err: std::io::Error) -> Self {
        BrokerError::NetworkError(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for BrokerError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        BrokerError::WebSocket(err.to_string())
    }
}

impl From<BrokerError> for WatchError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::Timeout(msg) => WatchError::Timeout(msg),
            BrokerError::Protocol(msg) => WatchError::Protocol(msg),
            other => WatchError::Broker(other.to_string()),
        }
    }
}
