//! 브로커 세션 준비 (브로커 선택, 시계, 싱크, 로그인).

use anyhow::{bail, Context, Result};
use condwatch_broker::{
    BridgeBroker, BridgeConfig, BrokerApi, KrissTimeSync, SimulatedBroker, SimulationScript,
};
use condwatch_core::{AppConfig, BrokerKind, Clock, LoginOutcome, OffsetClock, SystemClock, TimeConfig};
use condwatch_tracker::{ConditionMonitor, MonitorHandle, TrackerContext};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 브로커 연결 대상.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerSource {
    /// 브리지 어댑터 WebSocket URL
    Bridge(String),
    /// 시뮬레이션 스크립트 파일
    Script(PathBuf),
}

impl BrokerSource {
    /// 명령행 옵션을 우선하고, 없으면 설정 파일의 `[broker]` 섹션을 따릅니다.
    pub fn resolve(
        config: &AppConfig,
        bridge: Option<String>,
        script: Option<PathBuf>,
    ) -> Result<Self> {
        match (bridge, script) {
            (Some(_), Some(_)) => bail!("--bridge와 --script는 함께 사용할 수 없습니다"),
            (Some(url), None) => Ok(Self::Bridge(url)),
            (None, Some(path)) => Ok(Self::Script(path)),
            (None, None) => match config.broker.kind {
                BrokerKind::Bridge => Ok(Self::Bridge(config.broker.bridge_url.clone())),
                BrokerKind::Simulated => config
                    .broker
                    .script_path
                    .as_ref()
                    .map(|path| Self::Script(PathBuf::from(path)))
                    .context("simulated 브로커에는 broker.script_path 설정이 필요합니다"),
            },
        }
    }

    /// 브로커를 생성합니다.
    pub fn build(&self, config: &AppConfig) -> Result<Arc<dyn BrokerApi>> {
        match self {
            Self::Bridge(url) => {
                let bridge_config = BridgeConfig {
                    url: url.clone(),
                    ..BridgeConfig::from_settings(&config.broker)
                };
                info!(url = %url, "브리지 브로커 사용");
                Ok(Arc::new(BridgeBroker::new(bridge_config)))
            }
            Self::Script(path) => {
                let script = SimulationScript::from_json_file(path)
                    .with_context(|| format!("Failed to load script: {}", path.display()))?;
                info!(
                    path = %path.display(),
                    conditions = script.conditions.len(),
                    "시뮬레이션 브로커 사용"
                );
                Ok(Arc::new(SimulatedBroker::with_buffer(
                    script,
                    config.broker.event_buffer,
                )))
            }
        }
    }
}

/// 최초 포착 시각에 사용할 시계를 만듭니다.
///
/// 표준시 동기화가 켜져 있으면 서버와의 오차를 보정합니다.
/// 동기화에 실패하면 경고만 남기고 로컬 시계를 사용합니다.
pub async fn build_clock(time: &TimeConfig, sync: bool) -> Result<Arc<dyn Clock>> {
    let local = SystemClock::from_name(&time.timezone).context("Invalid time.timezone")?;

    if !(sync || time.sync_with_server) {
        return Ok(Arc::new(local));
    }

    let synced = match KrissTimeSync::from_settings(time) {
        Ok(client) => client.measure_offset(&local).await,
        Err(e) => Err(e),
    };

    match synced {
        Ok(offset) => {
            info!(offset_ms = offset.num_milliseconds(), "표준시 동기화 완료");
            Ok(Arc::new(OffsetClock::new(local, offset)))
        }
        Err(e) => {
            warn!(error = %e, "표준시 동기화 실패, 로컬 시계 사용");
            Ok(Arc::new(local))
        }
    }
}

/// 모니터를 띄우고 로그인까지 마칩니다.
pub async fn start_session(
    config: &AppConfig,
    context: TrackerContext,
) -> Result<(MonitorHandle, JoinHandle<()>)> {
    let (handle, task) = ConditionMonitor::spawn(context, config.tracker.command_buffer)?;

    let outcome = handle
        .connect_and_wait(config.broker.login_timeout())
        .await
        .context("로그인 요청 실패")?;

    match outcome {
        LoginOutcome::Connected => {
            info!("로그인 성공");
            Ok((handle, task))
        }
        other => {
            // 모니터 정리 후 종료
            if let Ok(report) = handle.shutdown().await {
                report.stats.log_summary("session");
            }
            task.abort();
            bail!("로그인 실패: {}", other)
        }
    }
}
