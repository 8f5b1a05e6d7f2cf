//! 조건검색 모니터.
//!
//! 브로커 이벤트 채널과 호출자 명령 채널을 `tokio::select!`로 함께 소비하는
//! 단일 태스크입니다. 추적기는 이 태스크만 소유하고 변경합니다.

use condwatch_core::{
    ConditionCatalog, ConditionEvent, ConnectionState, LoginOutcome, MarketPhase, ScreenId,
    SearchMode, TrackedStock,
};
use condwatch_broker::BrokerEvent;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::catalog::CatalogLoader;
use crate::connection::ConnectionManager;
use crate::membership::MembershipView;
use crate::tracker::{ConditionTracker, TrackerContext};
use crate::{TrackerError, TrackerResult, TrackerStats};

/// 모니터에 보내는 명령.
pub enum MonitorCommand {
    SendCondition {
        screen: ScreenId,
        condition_name: String,
        condition_index: i32,
        mode: SearchMode,
        reply: oneshot::Sender<TrackerResult<()>>,
    },
    StopCondition {
        screen: ScreenId,
        reply: oneshot::Sender<TrackerResult<()>>,
    },
    Snapshot {
        screen: ScreenId,
        reply: oneshot::Sender<Vec<TrackedStock>>,
    },
    View {
        screen: ScreenId,
        reply: oneshot::Sender<Option<MembershipView>>,
    },
    Flush {
        reply: oneshot::Sender<TrackerResult<()>>,
    },
    Stats {
        reply: oneshot::Sender<TrackerStats>,
    },
    Shutdown {
        reply: oneshot::Sender<MonitorReport>,
    },
}

/// 종료 시 최종 결과.
#[derive(Debug, Clone, Default)]
pub struct MonitorReport {
    /// 화면별 최종 추적 목록 (화면번호 순)
    pub snapshots: Vec<(ScreenId, Vec<TrackedStock>)>,
    /// 전체 통계
    pub stats: TrackerStats,
}

/// 조건검색 모니터 태스크.
pub struct ConditionMonitor {
    context: TrackerContext,
    connection: Arc<ConnectionManager>,
    catalog: Arc<CatalogLoader>,
    trackers: HashMap<ScreenId, ConditionTracker>,
    /// 어느 추적기에도 속하지 않는 이벤트 통계
    stats: TrackerStats,
    market_tx: watch::Sender<Option<MarketPhase>>,
}

impl ConditionMonitor {
    /// 모니터 태스크를 띄우고 핸들을 반환합니다.
    ///
    /// 브로커의 이벤트 채널을 가져가므로 브로커당 한 번만 호출할 수 있습니다.
    pub fn spawn(
        context: TrackerContext,
        command_buffer: usize,
    ) -> TrackerResult<(MonitorHandle, JoinHandle<()>)> {
        let events = context.broker.take_event_receiver().ok_or_else(|| {
            TrackerError::InvalidInput("브로커 이벤트 채널을 이미 가져갔습니다".to_string())
        })?;

        let connection = Arc::new(ConnectionManager::new(Arc::clone(&context.broker)));
        let catalog = Arc::new(CatalogLoader::new(Arc::clone(&context.broker)));
        let (market_tx, market_rx) = watch::channel(None);
        let (command_tx, command_rx) = mpsc::channel(command_buffer.max(1));

        let monitor = Self {
            context,
            connection: Arc::clone(&connection),
            catalog: Arc::clone(&catalog),
            trackers: HashMap::new(),
            stats: TrackerStats::new(),
            market_tx,
        };
        let task = tokio::spawn(monitor.run(events, command_rx));

        let handle = MonitorHandle {
            commands: command_tx,
            connection,
            catalog,
            market: market_rx,
        };
        Ok((handle, task))
    }

    async fn run(
        mut self,
        mut events: mpsc::Receiver<BrokerEvent>,
        mut commands: mpsc::Receiver<MonitorCommand>,
    ) {
        info!(broker = self.context.broker.name(), "조건검색 모니터 시작");
        let mut events_open = true;

        loop {
            tokio::select! {
                // 이미 도착한 브로커 이벤트를 명령보다 먼저 적용
                biased;

                event = events.recv(), if events_open => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => {
                            warn!("브로커 이벤트 채널 종료");
                            events_open = false;
                        }
                    }
                }
                command = commands.recv() => {
                    match command {
                        Some(MonitorCommand::Shutdown { reply }) => {
                            let report = self.shutdown().await;
                            let _ = reply.send(report);
                            break;
                        }
                        Some(command) => self.handle_command(command).await,
                        None => {
                            debug!("모든 핸들이 닫힘");
                            self.shutdown().await;
                            break;
                        }
                    }
                }
            }
        }

        info!("조건검색 모니터 종료");
    }

    async fn handle_event(&mut self, event: BrokerEvent) {
        match event {
            BrokerEvent::Login(code) => {
                if !self.connection.on_login_result(code) {
                    self.stats.anomalies += 1;
                }
            }
            BrokerEvent::ConditionCatalogLoaded { result, message } => {
                self.catalog.on_condition_catalog_loaded(result, &message);
            }
            BrokerEvent::Condition(event) => self.route_condition_event(event).await,
            BrokerEvent::MarketStatus(phase) => {
                info!(phase = %phase, "장운영 구분 변경");
                self.market_tx.send_replace(Some(phase));
            }
            BrokerEvent::Disconnected(reason) => {
                self.connection.on_disconnected(&reason);
                for tracker in self.trackers.values_mut() {
                    tracker.on_session_lost().await;
                }
            }
            BrokerEvent::Malformed(raw) => {
                self.stats.anomalies += 1;
                warn!(raw = %raw, "해석할 수 없는 브로커 메시지 무시");
            }
        }
    }

    /// (조건식 이름, 인덱스)가 일치하는 추적기로 이벤트를 보냅니다.
    /// 활성 추적기가 우선입니다.
    async fn route_condition_event(&mut self, event: ConditionEvent) {
        let target = self
            .trackers
            .values_mut()
            .filter(|t| t.owns(&event.condition_name, event.condition_index))
            .max_by_key(|t| t.is_active());

        match target {
            Some(tracker) => {
                tracker.on_condition_event(&event).await;
            }
            None => {
                self.stats.events += 1;
                self.stats.anomalies += 1;
                warn!(event = %event, "구독하지 않은 조건식의 이벤트 무시");
            }
        }
    }

    async fn handle_command(&mut self, command: MonitorCommand) {
        match command {
            MonitorCommand::SendCondition {
                screen,
                condition_name,
                condition_index,
                mode,
                reply,
            } => {
                let result = self
                    .send_condition(screen, &condition_name, condition_index, mode)
                    .await;
                let _ = reply.send(result);
            }
            MonitorCommand::StopCondition { screen, reply } => {
                let result = match self.trackers.get_mut(&screen) {
                    Some(tracker) => tracker.stop_condition().await,
                    None => Err(TrackerError::NotActive(screen.to_string())),
                };
                let _ = reply.send(result);
            }
            MonitorCommand::Snapshot { screen, reply } => {
                let snapshot = match self.trackers.get(&screen) {
                    Some(tracker) => tracker.snapshot().await,
                    None => Vec::new(),
                };
                let _ = reply.send(snapshot);
            }
            MonitorCommand::View { screen, reply } => {
                let _ = reply.send(self.trackers.get(&screen).map(ConditionTracker::view));
            }
            MonitorCommand::Flush { reply } => {
                let _ = reply.send(self.flush_all().await);
            }
            MonitorCommand::Stats { reply } => {
                let _ = reply.send(self.aggregate_stats());
            }
            MonitorCommand::Shutdown { .. } => {}
        }
    }

    async fn send_condition(
        &mut self,
        screen: ScreenId,
        condition_name: &str,
        condition_index: i32,
        mode: SearchMode,
    ) -> TrackerResult<()> {
        let state = self.connection.current_state();
        if state != ConnectionState::Connected {
            return Err(TrackerError::NotConnected(state.to_string()));
        }

        // 이벤트는 (조건식 이름, 인덱스)로만 구분되므로 한 조건식은 한 화면에서만 활성
        let requested = condition_name.trim();
        if let Some(owner) = self.trackers.values().find(|t| {
            t.screen() != &screen && t.is_active() && t.owns(requested, condition_index)
        }) {
            return Err(TrackerError::ConditionBusy {
                screen: owner.screen().to_string(),
                condition: requested.to_string(),
            });
        }

        let context = &self.context;
        let tracker = self
            .trackers
            .entry(screen.clone())
            .or_insert_with(|| ConditionTracker::new(screen, context.clone()));
        tracker
            .send_condition(condition_name, condition_index, mode)
            .await
    }

    /// 모든 추적기를 저장합니다. 실패해도 나머지는 계속 저장하고 첫 에러를 반환합니다.
    async fn flush_all(&mut self) -> TrackerResult<()> {
        let mut first_error = None;
        for tracker in self.trackers.values_mut() {
            if let Err(e) = tracker.flush().await {
                warn!(screen = %tracker.screen(), error = %e, "추적 목록 저장 실패");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn aggregate_stats(&self) -> TrackerStats {
        let mut total = self.stats.clone();
        for tracker in self.trackers.values() {
            total.merge(tracker.stats());
        }
        total
    }

    /// 저장 → 최종 목록 기록 → 활성 구독 중지 순서로 정리합니다.
    async fn shutdown(&mut self) -> MonitorReport {
        let mut screens: Vec<ScreenId> = self.trackers.keys().cloned().collect();
        screens.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        let mut snapshots = Vec::with_capacity(screens.len());
        for screen in screens {
            let Some(tracker) = self.trackers.get_mut(&screen) else {
                continue;
            };

            if let Err(e) = tracker.flush().await {
                warn!(screen = %screen, error = %e, "종료 시 추적 목록 저장 실패");
            }

            let snapshot = tracker.snapshot().await;
            info!(screen = %screen, count = snapshot.len(), "최종 추적 목록");
            for stock in &snapshot {
                info!(screen = %screen, "  {}", stock);
            }

            if tracker.is_active() {
                if let Err(e) = tracker.stop_condition().await {
                    warn!(screen = %screen, error = %e, "종료 시 구독 중지 실패");
                }
            }

            tracker.stats().log_summary(&format!("screen {}", screen));
            snapshots.push((screen, snapshot));
        }

        let stats = self.aggregate_stats();
        stats.log_summary("monitor");
        MonitorReport { snapshots, stats }
    }
}

/// 모니터 핸들. 여러 태스크에서 복제해 사용할 수 있습니다.
#[derive(Clone)]
pub struct MonitorHandle {
    commands: mpsc::Sender<MonitorCommand>,
    connection: Arc<ConnectionManager>,
    catalog: Arc<CatalogLoader>,
    market: watch::Receiver<Option<MarketPhase>>,
}

impl MonitorHandle {
    /// 세션 연결 관리자.
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.current_state()
    }

    /// 로그인 요청 후 최대 `timeout` 동안 결과를 기다립니다.
    pub async fn connect_and_wait(&self, timeout: Duration) -> TrackerResult<LoginOutcome> {
        self.connection.connect_and_wait(timeout).await
    }

    /// 조건식 목록을 로드하고 조회합니다.
    pub async fn load_conditions(&self, timeout: Duration) -> TrackerResult<ConditionCatalog> {
        self.catalog.load_conditions().await?;
        self.catalog.wait_and_list(timeout).await
    }

    /// 화면에 조건검색을 요청합니다.
    pub async fn send_condition(
        &self,
        screen: ScreenId,
        condition_name: impl Into<String>,
        condition_index: i32,
        mode: SearchMode,
    ) -> TrackerResult<()> {
        let condition_name = condition_name.into();
        self.request(|reply| MonitorCommand::SendCondition {
            screen,
            condition_name,
            condition_index,
            mode,
            reply,
        })
        .await?
    }

    /// 화면의 조건검색을 중지합니다.
    pub async fn stop_condition(&self, screen: ScreenId) -> TrackerResult<()> {
        self.request(|reply| MonitorCommand::StopCondition { screen, reply })
            .await?
    }

    /// 화면의 추적 목록. 추적기가 없으면 빈 목록.
    pub async fn snapshot(&self, screen: ScreenId) -> TrackerResult<Vec<TrackedStock>> {
        self.request(|reply| MonitorCommand::Snapshot { screen, reply })
            .await
    }

    /// 화면의 추적 목록 뷰. 한 번 받아 두면 모니터를 거치지 않고 읽을 수 있습니다.
    pub async fn view(&self, screen: ScreenId) -> TrackerResult<Option<MembershipView>> {
        self.request(|reply| MonitorCommand::View { screen, reply })
            .await
    }

    /// 모든 추적 목록을 저장합니다.
    pub async fn flush(&self) -> TrackerResult<()> {
        self.request(|reply| MonitorCommand::Flush { reply }).await?
    }

    /// 전체 처리 통계.
    pub async fn stats(&self) -> TrackerResult<TrackerStats> {
        self.request(|reply| MonitorCommand::Stats { reply }).await
    }

    /// 최근 장운영 구분.
    pub fn market_phase(&self) -> Option<MarketPhase> {
        self.market.borrow().clone()
    }

    /// 모니터를 정리하고 최종 결과를 받습니다.
    pub async fn shutdown(self) -> TrackerResult<MonitorReport> {
        self.request(|reply| MonitorCommand::Shutdown { reply }).await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> MonitorCommand,
    ) -> TrackerResult<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| TrackerError::MonitorStopped)?;
        rx.await.map_err(|_| TrackerError::MonitorStopped)
    }
}
