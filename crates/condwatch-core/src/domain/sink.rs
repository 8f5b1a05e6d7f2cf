//! 추적 목록을 받아 가는 협력자 계약.
//!
//! 싱크는 이벤트 적용 중에 호출됩니다. 싱크의 에러는 호출자가 로그로 남기고
//! 추적 상태에는 영향을 주지 않습니다.

use async_trait::async_trait;

use crate::domain::{ConditionSubscription, TrackedStock};
use crate::error::WatchResult;
use crate::types::StockCode;

/// 저장 싱크.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// 구독이 승인되었을 때 호출됩니다.
    async fn open(&self, _subscription: &ConditionSubscription) -> WatchResult<()> {
        Ok(())
    }

    /// 종목 편입을 기록합니다. 종목코드 기준 upsert이며 멱등이어야 합니다.
    async fn record_seen(&self, stock: &TrackedStock) -> WatchResult<()>;

    /// 종목 이탈을 기록합니다.
    async fn record_removed(&self, _condition_name: &str, _code: &StockCode) -> WatchResult<()> {
        Ok(())
    }

    /// 현재 추적 목록 전체를 저장합니다.
    async fn flush_all(&self, snapshot: &[TrackedStock]) -> WatchResult<()>;
}

/// 표시 싱크.
#[async_trait]
pub trait PresentationSink: Send + Sync {
    /// 추적 목록이 바뀔 때마다 편입 순서의 전체 목록을 받습니다.
    async fn on_membership_changed(&self, snapshot: &[TrackedStock]) -> WatchResult<()>;
}
