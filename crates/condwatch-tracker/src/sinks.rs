//! 기본 싱크 구현.

use async_trait::async_trait;
use condwatch_core::{
    ConditionSubscription, PersistenceSink, PresentationSink, StockCode, TrackedStock, WatchError,
    WatchResult,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// 추적 목록 변경을 로그로 남기는 표시 싱크.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPresentationSink;

#[async_trait]
impl PresentationSink for LogPresentationSink {
    async fn on_membership_changed(&self, snapshot: &[TrackedStock]) -> WatchResult<()> {
        let codes: Vec<&str> = snapshot.iter().map(|s| s.code.as_str()).collect();
        info!(count = snapshot.len(), codes = ?codes, "추적 목록 변경");
        Ok(())
    }
}

/// 아무것도 저장하지 않는 저장 싱크 (저장 비활성화 시).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPersistenceSink;

#[async_trait]
impl PersistenceSink for NoopPersistenceSink {
    async fn record_seen(&self, _stock: &TrackedStock) -> WatchResult<()> {
        Ok(())
    }

    async fn flush_all(&self, _snapshot: &[TrackedStock]) -> WatchResult<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryRecord {
    opened: Vec<ConditionSubscription>,
    seen: Vec<TrackedStock>,
    removed: Vec<(String, StockCode)>,
    flushed: Vec<Vec<TrackedStock>>,
    presented: Vec<Vec<TrackedStock>>,
}

/// 호출 내역을 메모리에 남기는 싱크. 저장/표시 양쪽으로 사용할 수 있습니다.
#[derive(Debug, Default)]
pub struct MemorySink {
    record: Mutex<MemoryRecord>,
    failing: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 이후 모든 호출이 실패하도록 설정합니다.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn opened(&self) -> Vec<ConditionSubscription> {
        self.lock().opened.clone()
    }

    pub fn seen(&self) -> Vec<TrackedStock> {
        self.lock().seen.clone()
    }

    pub fn removed(&self) -> Vec<(String, StockCode)> {
        self.lock().removed.clone()
    }

    pub fn flushed(&self) -> Vec<Vec<TrackedStock>> {
        self.lock().flushed.clone()
    }

    pub fn presented(&self) -> Vec<Vec<TrackedStock>> {
        self.lock().presented.clone()
    }

    /// 마지막으로 표시된 목록.
    pub fn last_presented(&self) -> Option<Vec<TrackedStock>> {
        self.lock().presented.last().cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self) -> WatchResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(WatchError::Storage("memory sink set to fail".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PersistenceSink for MemorySink {
    async fn open(&self, subscription: &ConditionSubscription) -> WatchResult<()> {
        self.check()?;
        self.lock().opened.push(subscription.clone());
        Ok(())
    }

    async fn record_seen(&self, stock: &TrackedStock) -> WatchResult<()> {
        self.check()?;
        self.lock().seen.push(stock.clone());
        Ok(())
    }

    async fn record_removed(&self, condition_name: &str, code: &StockCode) -> WatchResult<()> {
        self.check()?;
        self.lock()
            .removed
            .push((condition_name.to_string(), code.clone()));
        Ok(())
    }

    async fn flush_all(&self, snapshot: &[TrackedStock]) -> WatchResult<()> {
        self.check()?;
        self.lock().flushed.push(snapshot.to_vec());
        Ok(())
    }
}

#[async_trait]
impl PresentationSink for MemorySink {
    async fn on_membership_changed(&self, snapshot: &[TrackedStock]) -> WatchResult<()> {
        self.check()?;
        self.lock().presented.push(snapshot.to_vec());
        Ok(())
    }
}
