//! 저장된 세션 파일 조회 명령.

use anyhow::{Context, Result};
use condwatch_core::TrackedStock;
use condwatch_storage::SessionStore;
use std::path::Path;
use tracing::info;

use super::output::{render_tracked, OutputFormat};

/// 세션 파일의 행을 읽습니다.
pub async fn read_session(path: &Path) -> Result<Vec<TrackedStock>> {
    let store = SessionStore::open(path)
        .await
        .with_context(|| format!("Failed to open session file: {}", path.display()))?;
    let rows = store.read_all().await.context("Failed to read tracked stocks")?;
    store.close().await;

    info!(path = %path.display(), count = rows.len(), "세션 파일 조회");
    Ok(rows)
}

/// 세션 파일 내용을 출력합니다.
pub async fn run_show(path: &Path, format: OutputFormat) -> Result<usize> {
    let rows = read_session(path).await?;
    println!("{}", render_tracked(&rows, format)?);
    Ok(rows.len())
}
