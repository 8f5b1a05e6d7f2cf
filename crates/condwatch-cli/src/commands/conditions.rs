//! 조건식 목록 조회 명령.

use anyhow::{Context, Result};
use condwatch_core::{AppConfig, ConditionCatalog, SystemClock};
use condwatch_tracker::{LogPresentationSink, NoopPersistenceSink, TrackerContext, TrackerOptions};
use std::sync::Arc;
use tracing::{info, warn};

use super::output::format_catalog;
use super::session::{start_session, BrokerSource};

/// 로그인 후 사용자 조건식 목록을 조회합니다.
pub async fn list_conditions(config: &AppConfig, source: &BrokerSource) -> Result<ConditionCatalog> {
    let context = TrackerContext {
        broker: source.build(config)?,
        clock: Arc::new(SystemClock::from_name(&config.time.timezone)?),
        persistence: Arc::new(NoopPersistenceSink),
        presentation: Arc::new(LogPresentationSink),
        options: TrackerOptions::default(),
    };

    let (handle, task) = start_session(config, context).await?;

    let catalog = handle
        .load_conditions(config.broker.request_timeout())
        .await
        .context("조건식 목록 조회 실패")?;
    info!(count = catalog.len(), "조건식 목록 로드");

    handle.shutdown().await.context("모니터 종료 실패")?;
    if let Err(e) = task.await {
        warn!(error = %e, "모니터 태스크 비정상 종료");
    }

    Ok(catalog)
}

/// 조건식 목록을 조회해 출력합니다.
pub async fn run_conditions(config: &AppConfig, source: &BrokerSource) -> Result<usize> {
    let catalog = list_conditions(config, source).await?;
    println!("{}", format_catalog(&catalog));
    Ok(catalog.len())
}
