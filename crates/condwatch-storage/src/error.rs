//! 저장소 오류 타입.

use condwatch_core::WatchError;
use thiserror::Error;

/// 저장소 관련 오류.
#[derive(Debug, Error)]
pub enum StorageError {
    /// 데이터베이스 연결 오류
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// 쿼리 실행 오류
    #[error("Query error: {0}")]
    QueryError(String),

    /// 파일을 찾을 수 없음
    #[error("Database file not found: {0}")]
    NotFound(String),

    /// 잘못된 데이터 형식
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// 파일 시스템 오류
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// 저장소 작업을 위한 Result 타입.
pub type Result<T> = std::result::Result<T, StorageError>;

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StorageError::ConnectionError(err.to_string())
            }
            sqlx::Error::Io(io) => StorageError::Io(io),
            sqlx::Error::Configuration(e) => StorageError::ConnectionError(e.to_string()),
            other => StorageError::QueryError(other.to_string()),
        }
    }
}

impl From<StorageError> for WatchError {
    fn from(err: StorageError) -> Self {
        WatchError::Storage(err.to_string())
    }
}
