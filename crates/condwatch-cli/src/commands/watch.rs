//! 조건식 실시간 감시 명령.
//!
//! 로그인 → 조건식 목록 조회 → 조건검색 요청 → 종료 신호까지 편입/이탈 추적 →
//! 저장 후 최종 목록 출력 순서로 진행합니다.

use anyhow::{anyhow, Context, Result};
use condwatch_core::{AppConfig, ConditionCatalog, PersistenceSink, ScreenId, SearchMode};
use condwatch_storage::SqlitePersistenceSink;
use condwatch_tracker::{
    LogPresentationSink, MonitorReport, NoopPersistenceSink, TrackerContext, TrackerOptions,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::output::format_table;
use super::session::{build_clock, start_session, BrokerSource};

/// 감시 설정.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// 조건식 이름
    pub condition: String,
    /// 조건식 인덱스 (없으면 목록에서 이름으로 찾음)
    pub index: Option<i32>,
    /// 화면번호 (없으면 설정값)
    pub screen: Option<String>,
    /// 조회 방식 (없으면 설정값)
    pub mode: Option<SearchMode>,
    /// 브로커 연결 대상
    pub source: BrokerSource,
    /// 표준시 동기화 강제
    pub sync_time: bool,
    /// 지정 시간 후 자동 종료
    pub duration: Option<Duration>,
    /// 종료 시 최종 목록 출력 여부
    pub print_final: bool,
}

/// 조건식 이름과 인덱스를 확정합니다.
///
/// 인덱스가 주어졌는데 목록의 이름과 다르면 경고만 남기고 주어진 값을 사용합니다.
pub fn resolve_condition(
    catalog: &ConditionCatalog,
    name: &str,
    index: Option<i32>,
) -> Result<(String, i32)> {
    match index {
        Some(index) => {
            match catalog.find_by_index(index) {
                Some(entry) if entry.name != name => warn!(
                    index,
                    requested = name,
                    listed = %entry.name,
                    "조건식 이름이 목록과 다름"
                ),
                None => warn!(index, condition = name, "목록에 없는 조건식 인덱스"),
                _ => {}
            }
            Ok((name.to_string(), index))
        }
        None => {
            let entry = catalog.find_by_name(name).ok_or_else(|| {
                let names: Vec<&str> = catalog.entries().iter().map(|c| c.name.as_str()).collect();
                anyhow!("조건식 '{}'을(를) 찾을 수 없습니다. 사용 가능: {:?}", name, names)
            })?;
            Ok((entry.name.clone(), entry.index))
        }
    }
}

/// 조건식을 감시합니다. 종료 시 최종 결과를 반환합니다.
pub async fn run_watch(config: &AppConfig, options: WatchOptions) -> Result<MonitorReport> {
    let screen = ScreenId::parse(
        options
            .screen
            .as_deref()
            .unwrap_or(&config.tracker.screen_id),
    )?;
    let mode = options.mode.unwrap_or(config.tracker.search_mode);

    let clock = build_clock(&config.time, options.sync_time).await?;
    let broker = options.source.build(config)?;

    let storage = config
        .storage
        .enabled
        .then(|| Arc::new(SqlitePersistenceSink::from_settings(&config.storage)));
    let persistence: Arc<dyn PersistenceSink> = match &storage {
        Some(sink) => {
            info!(data_dir = %sink.data_dir().display(), "SQLite 저장 사용");
            Arc::clone(sink) as Arc<dyn PersistenceSink>
        }
        None => Arc::new(NoopPersistenceSink),
    };

    let context = TrackerContext {
        broker,
        clock,
        persistence,
        presentation: Arc::new(LogPresentationSink),
        options: TrackerOptions {
            clear_on_stop: config.tracker.clear_on_stop,
        },
    };

    let (handle, task) = start_session(config, context).await?;

    let catalog = handle
        .load_conditions(config.broker.request_timeout())
        .await
        .context("조건식 목록 조회 실패")?;
    info!(count = catalog.len(), "조건식 목록 로드");

    let (name, index) = resolve_condition(&catalog, &options.condition, options.index)?;
    handle
        .send_condition(screen.clone(), name.clone(), index, mode)
        .await
        .with_context(|| format!("조건검색 요청 실패: {} (화면 {})", name, screen))?;
    info!(condition = %name, index, screen = %screen, mode = %mode, "조건검색 감시 시작");

    let mut state = handle.connection().subscribe();
    let deadline = async {
        match options.duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("종료 신호 수신, 감시 종료 중...");
                break;
            }
            _ = &mut deadline => {
                info!("감시 시간 종료");
                break;
            }
            changed = state.changed() => {
                if changed.is_err() {
                    warn!("연결 상태 채널 닫힘");
                    break;
                }
                let current = *state.borrow_and_update();
                if !current.is_connected() {
                    warn!(state = %current, "세션 연결 끊김, 감시 종료");
                    break;
                }
            }
        }
    }

    if let Some(phase) = handle.market_phase() {
        info!(phase = %phase, "마지막 장운영 구분");
    }

    let report = handle.shutdown().await.context("모니터 종료 실패")?;
    if let Err(e) = task.await {
        warn!(error = %e, "모니터 태스크 비정상 종료");
    }
    if let Some(sink) = storage {
        sink.close_all().await;
    }

    if options.print_final {
        for (screen, stocks) in &report.snapshots {
            println!("[화면 {}]", screen);
            println!("{}", format_table(stocks));
        }
    }

    Ok(report)
}

/// `--mode` 인자를 파싱합니다.
pub fn parse_mode(raw: &str) -> Result<SearchMode> {
    raw.parse::<SearchMode>()
        .map_err(|e| anyhow!("{} (snapshot, live 중 선택)", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ConditionCatalog {
        ConditionCatalog::parse("000^급등주;003^신고가;").unwrap()
    }

    #[test]
    fn test_resolve_by_name() {
        assert_eq!(
            resolve_condition(&catalog(), "신고가", None).unwrap(),
            ("신고가".to_string(), 3)
        );
        assert!(resolve_condition(&catalog(), "없는조건", None).is_err());
    }

    #[test]
    fn test_resolve_with_explicit_index() {
        // 명시한 인덱스는 목록과 달라도 그대로 사용
        assert_eq!(
            resolve_condition(&catalog(), "급등주", Some(7)).unwrap(),
            ("급등주".to_string(), 7)
        );
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("snapshot").unwrap(), SearchMode::Snapshot);
        assert_eq!(parse_mode("1").unwrap(), SearchMode::Live);
        assert!(parse_mode("stream").is_err());
    }
}
