//! 브로커 세션 연결 상태.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 로그인 성공을 나타내는 결과 코드.
pub const LOGIN_SUCCESS: i32 = 0;

/// 세션 연결 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "code", rename_all = "snake_case")]
pub enum ConnectionState {
    /// 연결 안 됨
    #[default]
    Disconnected,
    /// 연결 요청 후 로그인 결과 대기 중
    Connecting,
    /// 로그인 성공
    Connected,
    /// 로그인 실패 (브로커 결과 코드)
    Failed(i32),
}

impl ConnectionState {
    /// 로그인 결과 코드에서 상태를 결정합니다.
    pub fn from_login_code(code: i32) -> Self {
        if code == LOGIN_SUCCESS {
            ConnectionState::Connected
        } else {
            ConnectionState::Failed(code)
        }
    }

    /// 로그인된 상태인지 확인합니다.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// 로그인 결과가 확정된 상태인지 확인합니다.
    pub fn is_settled(&self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Failed(_))
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Failed(code) => write!(f, "failed({})", code),
        }
    }
}

/// 제한 시간이 있는 로그인 대기의 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// 로그인 성공
    Connected,
    /// 로그인 실패 (브로커 결과 코드)
    Failed(i32),
    /// 제한 시간 내에 로그인 결과가 도착하지 않음
    TimedOut,
}

impl LoginOutcome {
    /// 성공 여부.
    pub fn is_connected(&self) -> bool {
        matches!(self, LoginOutcome::Connected)
    }
}

impl fmt::Display for LoginOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginOutcome::Connected => write!(f, "로그인 성공"),
            LoginOutcome::Failed(code) => write!(f, "로그인 실패: {}", code),
            LoginOutcome::TimedOut => write!(f, "로그인 응답 시간 초과"),
        }
    }
}
