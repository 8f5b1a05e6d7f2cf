//! 조건식 목록 로드.

use condwatch_broker::BrokerApi;
use condwatch_core::{ConditionCatalog, CATALOG_LOAD_SUCCESS};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{TrackerError, TrackerResult};

/// 조건식 목록 로드 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogStatus {
    pub result: i32,
    pub message: String,
}

impl CatalogStatus {
    pub fn is_success(&self) -> bool {
        self.result == CATALOG_LOAD_SUCCESS
    }
}

/// 조건식 목록 로더.
///
/// 로드 요청 후 결과 콜백(`on_condition_catalog_loaded`)이 오면 목록을 조회할 수 있습니다.
pub struct CatalogLoader {
    broker: Arc<dyn BrokerApi>,
    status_tx: watch::Sender<Option<CatalogStatus>>,
}

impl CatalogLoader {
    pub fn new(broker: Arc<dyn BrokerApi>) -> Self {
        let (status_tx, _) = watch::channel(None);
        Self { broker, status_tx }
    }

    /// 조건식 목록 로드 요청.
    pub async fn load_conditions(&self) -> TrackerResult<()> {
        self.status_tx.send_replace(None);
        self.broker.load_condition_catalog().await?;
        Ok(())
    }

    /// 로드 결과 콜백 처리. 성공이면 `true`.
    pub fn on_condition_catalog_loaded(&self, result: i32, message: &str) -> bool {
        let status = CatalogStatus {
            result,
            message: message.to_string(),
        };
        let success = status.is_success();
        if success {
            info!(result, message, "조건식 목록 로드 완료");
        } else {
            warn!(result, message, "조건식 목록 로드 실패");
        }
        self.status_tx.send_replace(Some(status));
        success
    }

    /// 마지막 로드 결과.
    pub fn status(&self) -> Option<CatalogStatus> {
        self.status_tx.borrow().clone()
    }

    /// 로드 결과를 기다린 뒤 조건식 목록을 조회합니다.
    pub async fn wait_and_list(&self, timeout: Duration) -> TrackerResult<ConditionCatalog> {
        let mut rx = self.status_tx.subscribe();
        let status = tokio::time::timeout(timeout, rx.wait_for(Option::is_some))
            .await
            .map_err(|_| TrackerError::Timeout("조건식 목록 로드 결과 대기".to_string()))?
            .map_err(|_| TrackerError::MonitorStopped)?
            .clone();

        match status {
            Some(status) if status.is_success() => self.list().await,
            Some(status) => Err(TrackerError::Broker(condwatch_broker::BrokerError::Protocol(
                format!("조건식 목록 로드 실패 ({}): {}", status.result, status.message),
            ))),
            None => Err(TrackerError::MonitorStopped),
        }
    }

    /// 로드된 조건식 목록 조회.
    pub async fn list(&self) -> TrackerResult<ConditionCatalog> {
        let entries = self.broker.condition_list().await?;
        Ok(ConditionCatalog::new(entries))
    }
}
