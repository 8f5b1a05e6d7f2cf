//! 스크립트 기반 시뮬레이션 브로커.

use async_trait::async_trait;
use condwatch_core::{ConditionEvent, ConditionInfo, MarketPhase, ScreenId, SearchMode, LOGIN_SUCCESS};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::script::{AckPolicy, SimulationScript};
use crate::{BrokerApi, BrokerError, BrokerEvent, BrokerResult};

/// 기본 이벤트 채널 크기.
const DEFAULT_EVENT_BUFFER: usize = 1000;

/// 시뮬레이션 브로커가 받은 요청 기록.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedCommand {
    Connect,
    LoadConditionCatalog,
    ConditionList,
    SendCondition {
        screen: ScreenId,
        condition_name: String,
        condition_index: i32,
        mode: SearchMode,
    },
    StopCondition {
        screen: ScreenId,
        condition_name: String,
        condition_index: i32,
    },
}

/// 시뮬레이션 브로커.
///
/// 승인된 조건검색마다 화면별 재생 태스크를 하나씩 둡니다.
/// `injector()`로 임의의 이벤트를 직접 넣을 수도 있습니다.
pub struct SimulatedBroker {
    script: SimulationScript,
    event_tx: mpsc::Sender<BrokerEvent>,
    event_rx: Mutex<Option<mpsc::Receiver<BrokerEvent>>>,
    commands: Mutex<Vec<SimulatedCommand>>,
    logged_in: Arc<AtomicBool>,
    playbacks: Mutex<HashMap<ScreenId, JoinHandle<()>>>,
}

impl SimulatedBroker {
    /// 새로운 시뮬레이션 브로커를 생성합니다.
    pub fn new(script: SimulationScript) -> Self {
        Self::with_buffer(script, DEFAULT_EVENT_BUFFER)
    }

    /// 이벤트 채널 크기를 지정해 생성합니다.
    pub fn with_buffer(script: SimulationScript, event_buffer: usize) -> Self {
        let (event_tx, event_rx) = mpsc::channel(event_buffer.max(1));
        Self {
            script,
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            commands: Mutex::new(Vec::new()),
            logged_in: Arc::new(AtomicBool::new(false)),
            playbacks: Mutex::new(HashMap::new()),
        }
    }

    /// 이벤트를 직접 넣는 송신기.
    pub fn injector(&self) -> mpsc::Sender<BrokerEvent> {
        self.event_tx.clone()
    }

    /// 지금까지 받은 요청 목록.
    pub fn commands(&self) -> Vec<SimulatedCommand> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 로그인 성공 여부.
    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    pub fn script(&self) -> &SimulationScript {
        &self.script
    }

    fn record(&self, command: SimulatedCommand) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
    }

    fn ensure_logged_in(&self) -> BrokerResult<()> {
        if self.is_logged_in() {
            Ok(())
        } else {
            Err(BrokerError::NotConnected)
        }
    }

    fn is_accepted(&self, condition_name: &str, condition_index: i32) -> bool {
        match self.script.ack_policy {
            AckPolicy::AcceptAll => true,
            AckPolicy::RejectAll => false,
            AckPolicy::PerCondition => self
                .script
                .find(condition_name, condition_index)
                .map(|c| c.accept)
                .unwrap_or(false),
        }
    }

    fn cancel_playback(&self, screen: &ScreenId) {
        let handle = self
            .playbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(screen);
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    fn start_playback(&self, screen: &ScreenId, info: ConditionInfo, mode: SearchMode) -> BrokerResult<()> {
        let Some(scripted) = self.script.find(&info.name, info.index) else {
            debug!(condition = %info.name, "스크립트에 없는 조건식, 재생할 이벤트 없음");
            return Ok(());
        };

        let mut initial = Vec::with_capacity(scripted.initial.len());
        for code in &scripted.initial {
            let event = ConditionEvent::from_raw(code, "I", &info.name, &info.index.to_string())
                .map_err(|e| BrokerError::Script(e.to_string()))?;
            initial.push(event);
        }

        let mut timed = Vec::new();
        if mode.is_live() {
            for scripted_event in &scripted.events {
                timed.push((scripted_event.delay(), scripted_event.to_event(&info)?));
            }
        }

        let tx = self.event_tx.clone();
        let handle = tokio::spawn(async move {
            for event in initial {
                if tx.send(BrokerEvent::Condition(event)).await.is_err() {
                    return;
                }
            }
            for (delay, event) in timed {
                tokio::time::sleep(delay).await;
                if tx.send(BrokerEvent::Condition(event)).await.is_err() {
                    return;
                }
            }
        });

        let previous = self
            .playbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(screen.clone(), handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        Ok(())
    }
}

impl Drop for SimulatedBroker {
    fn drop(&mut self) {
        let playbacks = self
            .playbacks
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in playbacks.drain() {
            handle.abort();
        }
    }
}

#[async_trait]
impl BrokerApi for SimulatedBroker {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn connect(&self) -> BrokerResult<()> {
        self.record(SimulatedCommand::Connect);

        let Some(code) = self.script.login_code else {
            warn!("시뮬레이션: 로그인 응답 없음으로 설정됨");
            return Ok(());
        };

        let delay = self.script.login_delay();
        let market_status = self.script.market_status.clone();
        let logged_in = Arc::clone(&self.logged_in);
        let tx = self.event_tx.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if code == LOGIN_SUCCESS {
                logged_in.store(true, Ordering::SeqCst);
            }
            info!(code, "시뮬레이션: 로그인 결과 전송");
            if tx.send(BrokerEvent::Login(code)).await.is_err() || code != LOGIN_SUCCESS {
                return;
            }
            for status in market_status {
                tokio::time::sleep(std::time::Duration::from_millis(status.delay_ms)).await;
                let phase = MarketPhase::from_raw(&status.value);
                if tx.send(BrokerEvent::MarketStatus(phase)).await.is_err() {
                    return;
                }
            }
        });

        Ok(())
    }

    async fn load_condition_catalog(&self) -> BrokerResult<()> {
        self.ensure_logged_in()?;
        self.record(SimulatedCommand::LoadConditionCatalog);

        let event = BrokerEvent::ConditionCatalogLoaded {
            result: self.script.catalog_result,
            message: "조건검색식 로드 완료".to_string(),
        };
        self.event_tx
            .send(event)
            .await
            .map_err(|_| BrokerError::Disconnected("이벤트 채널 닫힘".to_string()))
    }

    async fn condition_list(&self) -> BrokerResult<Vec<ConditionInfo>> {
        self.ensure_logged_in()?;
        self.record(SimulatedCommand::ConditionList);
        Ok(self.script.catalog())
    }

    async fn send_condition(
        &self,
        screen: &ScreenId,
        condition_name: &str,
        condition_index: i32,
        mode: SearchMode,
    ) -> BrokerResult<bool> {
        self.ensure_logged_in()?;
        self.record(SimulatedCommand::SendCondition {
            screen: screen.clone(),
            condition_name: condition_name.to_string(),
            condition_index,
            mode,
        });

        if !self.is_accepted(condition_name, condition_index) {
            info!(condition = condition_name, "시뮬레이션: 조건검색 요청 거부");
            return Ok(false);
        }

        self.start_playback(
            screen,
            ConditionInfo::new(condition_index, condition_name),
            mode,
        )?;
        Ok(true)
    }

    async fn stop_condition(
        &self,
        screen: &ScreenId,
        condition_name: &str,
        condition_index: i32,
    ) -> BrokerResult<()> {
        self.record(SimulatedCommand::StopCondition {
            screen: screen.clone(),
            condition_name: condition_name.to_string(),
            condition_index,
        });
        self.cancel_playback(screen);
        Ok(())
    }

    fn take_event_receiver(&self) -> Option<mpsc::Receiver<BrokerEvent>> {
        self.event_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
