//! 브리지 어댑터 WebSocket 클라이언트.

use async_trait::async_trait;
use condwatch_core::{BrokerConfig, ConditionInfo, ScreenId, SearchMode};
use futures::{SinkExt, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::time::{interval, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, instrument, warn};

use super::protocol::{BridgeCommand, BridgeMessage};
use crate::{BrokerApi, BrokerError, BrokerEvent, BrokerResult};

/// Ping 간격 (초).
const PING_INTERVAL_SECS: u64 = 30;

/// 송신 대기열 크기.
const OUTBOUND_BUFFER: usize = 64;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 브리지 클라이언트 설정.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// 어댑터 WebSocket URL (예: "ws://127.0.0.1:8765")
    pub url: String,
    /// 연결 타임아웃
    pub connect_timeout: Duration,
    /// 요청-응답 타임아웃
    pub request_timeout: Duration,
    /// 이벤트 채널 버퍼 크기
    pub event_buffer: usize,
}

impl BridgeConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            event_buffer: 1000,
        }
    }

    /// 요청-응답 타임아웃을 설정합니다.
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// 설정 파일의 `[broker]` 섹션에서 생성합니다.
    pub fn from_settings(settings: &BrokerConfig) -> Self {
        Self {
            url: settings.bridge_url.clone(),
            connect_timeout: settings.connect_timeout(),
            request_timeout: settings.request_timeout(),
            event_buffer: settings.event_buffer.max(1),
        }
    }
}

/// 응답을 기다리는 요청들.
///
/// 어댑터는 요청 순서대로 응답하므로 FIFO로 짝을 맞춥니다.
/// 시간 초과로 포기한 요청은 응답이 왔을 때 건너뜁니다.
#[derive(Default)]
struct PendingReplies {
    acks: HashMap<(String, String), VecDeque<oneshot::Sender<bool>>>,
    lists: VecDeque<oneshot::Sender<Vec<ConditionInfo>>>,
}

impl PendingReplies {
    fn push_ack(&mut self, screen: String, condition_name: String) -> oneshot::Receiver<bool> {
        let (tx, rx) = oneshot::channel();
        self.acks
            .entry((screen, condition_name))
            .or_default()
            .push_back(tx);
        rx
    }

    fn take_ack(&mut self, screen: &str, condition_name: &str) -> Option<oneshot::Sender<bool>> {
        let key = (screen.to_string(), condition_name.to_string());
        let queue = self.acks.get_mut(&key)?;
        let waiter = take_open(queue);
        if queue.is_empty() {
            self.acks.remove(&key);
        }
        waiter
    }

    fn push_list(&mut self) -> oneshot::Receiver<Vec<ConditionInfo>> {
        let (tx, rx) = oneshot::channel();
        self.lists.push_back(tx);
        rx
    }

    fn take_list(&mut self) -> Option<oneshot::Sender<Vec<ConditionInfo>>> {
        take_open(&mut self.lists)
    }

    fn clear(&mut self) {
        self.acks.clear();
        self.lists.clear();
    }
}

fn take_open<T>(queue: &mut VecDeque<oneshot::Sender<T>>) -> Option<oneshot::Sender<T>> {
    while let Some(waiter) = queue.pop_front() {
        if !waiter.is_closed() {
            return Some(waiter);
        }
    }
    None
}

/// 브리지 어댑터 클라이언트.
pub struct BridgeBroker {
    config: BridgeConfig,
    event_tx: mpsc::Sender<BrokerEvent>,
    event_rx: Mutex<Option<mpsc::Receiver<BrokerEvent>>>,
    outbound: tokio::sync::Mutex<Option<mpsc::Sender<Message>>>,
    pending: Arc<tokio::sync::Mutex<PendingReplies>>,
    is_connected: Arc<RwLock<bool>>,
}

impl BridgeBroker {
    /// 새로운 브리지 클라이언트 생성. 연결은 `connect()`에서 맺습니다.
    pub fn new(config: BridgeConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(config.event_buffer.max(1));
        Self {
            config,
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            outbound: tokio::sync::Mutex::new(None),
            pending: Arc::new(tokio::sync::Mutex::new(PendingReplies::default())),
            is_connected: Arc::new(RwLock::new(false)),
        }
    }

    /// WebSocket 연결 상태 확인.
    pub async fn is_connected(&self) -> bool {
        *self.is_connected.read().await
    }

    /// 연결이 없으면 새로 맺고 송신 채널을 반환합니다.
    async fn ensure_transport(&self) -> BrokerResult<mpsc::Sender<Message>> {
        let mut outbound = self.outbound.lock().await;
        if let Some(tx) = outbound.as_ref() {
            if !tx.is_closed() {
                return Ok(tx.clone());
            }
        }

        info!(url = %self.config.url, "브리지 어댑터 연결 중");

        let (ws_stream, _) = timeout(self.config.connect_timeout, connect_async(self.config.url.as_str()))
            .await
            .map_err(|_| {
                BrokerError::Timeout(format!(
                    "브리지 연결 시간 초과 ({:?})",
                    self.config.connect_timeout
                ))
            })?
            .map_err(|e| BrokerError::NetworkError(format!("WebSocket 연결 실패: {}", e)))?;

        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        let (relay_tx, relay_rx) = mpsc::unbounded_channel();
        *self.is_connected.write().await = true;

        tokio::spawn(relay_events(relay_rx, self.event_tx.clone()));
        tokio::spawn(run_io(
            ws_stream,
            rx,
            relay_tx,
            Arc::clone(&self.pending),
            Arc::clone(&self.is_connected),
        ));

        info!("브리지 어댑터 연결 성공");
        *outbound = Some(tx.clone());
        Ok(tx)
    }

    /// 연결된 송신 채널. 연결 전이면 에러.
    async fn transport(&self) -> BrokerResult<mpsc::Sender<Message>> {
        match self.outbound.lock().await.as_ref() {
            Some(tx) if !tx.is_closed() => Ok(tx.clone()),
            _ => Err(BrokerError::NotConnected),
        }
    }

    async fn send_command(&self, tx: &mpsc::Sender<Message>, command: &BridgeCommand) -> BrokerResult<()> {
        let text = command.encode()?;
        debug!(command = %text, "브리지 명령 전송");
        tx.send(Message::Text(text))
            .await
            .map_err(|_| BrokerError::Disconnected("송신 채널 닫힘".to_string()))
    }

    async fn await_reply<T>(&self, rx: oneshot::Receiver<T>, what: &str) -> BrokerResult<T> {
        match timeout(self.config.request_timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(BrokerError::Disconnected(format!(
                "{} 응답 대기 중 연결 끊김",
                what
            ))),
            Err(_) => Err(BrokerError::Timeout(format!(
                "{} 응답 시간 초과 ({:?})",
                what, self.config.request_timeout
            ))),
        }
    }
}

#[async_trait]
impl BrokerApi for BridgeBroker {
    fn name(&self) -> &str {
        "bridge"
    }

    #[instrument(skip(self), fields(url = %self.config.url))]
    async fn connect(&self) -> BrokerResult<()> {
        let tx = self.ensure_transport().await?;
        self.send_command(&tx, &BridgeCommand::Connect).await
    }

    async fn load_condition_catalog(&self) -> BrokerResult<()> {
        let tx = self.transport().await?;
        self.send_command(&tx, &BridgeCommand::LoadConditions).await
    }

    async fn condition_list(&self) -> BrokerResult<Vec<ConditionInfo>> {
        let tx = self.transport().await?;
        let rx = self.pending.lock().await.push_list();
        self.send_command(&tx, &BridgeCommand::ListConditions).await?;
        self.await_reply(rx, "LIST_CONDITIONS").await
    }

    #[instrument(skip(self, screen), fields(screen = %screen))]
    async fn send_condition(
        &self,
        screen: &ScreenId,
        condition_name: &str,
        condition_index: i32,
        mode: SearchMode,
    ) -> BrokerResult<bool> {
        let command = BridgeCommand::SendCondition {
            screen: screen.clone(),
            condition_name: condition_name.to_string(),
            condition_index,
            mode,
        };
        // 인코딩 에러는 대기열 등록 전에 확인
        command.encode()?;

        let tx = self.transport().await?;
        let rx = self
            .pending
            .lock()
            .await
            .push_ack(screen.to_string(), condition_name.to_string());
        self.send_command(&tx, &command).await?;
        self.await_reply(rx, "SEND_CONDITION").await
    }

    async fn stop_condition(
        &self,
        screen: &ScreenId,
        condition_name: &str,
        condition_index: i32,
    ) -> BrokerResult<()> {
        let tx = self.transport().await?;
        let command = BridgeCommand::StopCondition {
            screen: screen.clone(),
            condition_name: condition_name.to_string(),
            condition_index,
        };
        self.send_command(&tx, &command).await
    }

    fn take_event_receiver(&self) -> Option<mpsc::Receiver<BrokerEvent>> {
        self.event_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// 연결 루프가 받은 이벤트를 소비자 채널로 옮깁니다.
///
/// 소비자가 이벤트를 읽지 않아도 연결 루프는 `SEND_ACK`를 계속 읽어야 하므로
/// 중간 대기열은 크기 제한이 없습니다.
async fn relay_events(
    mut relay: mpsc::UnboundedReceiver<BrokerEvent>,
    event_tx: mpsc::Sender<BrokerEvent>,
) {
    while let Some(event) = relay.recv().await {
        if event_tx.send(event).await.is_err() {
            debug!("이벤트 소비자 없음, 전달 중단");
            break;
        }
    }
}

/// 수신/송신/Ping을 처리하는 연결 루프.
///
/// 연결이 끊기면 대기 중인 요청을 모두 해제하고 `Disconnected` 이벤트를 보냅니다.
async fn run_io(
    ws_stream: WsStream,
    mut outbound: mpsc::Receiver<Message>,
    event_tx: mpsc::UnboundedSender<BrokerEvent>,
    pending: Arc<tokio::sync::Mutex<PendingReplies>>,
    is_connected: Arc<RwLock<bool>>,
) {
    let (mut write, mut read) = ws_stream.split();

    // Ping 타이머 (첫 tick은 즉시 발생하므로 건너뜀)
    let mut ping_interval = interval(Duration::from_secs(PING_INTERVAL_SECS));
    ping_interval.tick().await;

    let reason = loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        dispatch(&text, &event_tx, &pending).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        debug!("Ping 수신, Pong 응답");
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) => {
                        break "어댑터에서 연결 종료 요청".to_string();
                    }
                    Some(Err(e)) => {
                        error!("WebSocket 수신 에러: {}", e);
                        break format!("WebSocket 수신 에러: {}", e);
                    }
                    None => {
                        break "WebSocket 스트림 종료".to_string();
                    }
                    _ => {}
                }
            }
            out = outbound.recv() => {
                match out {
                    Some(msg) => {
                        if let Err(e) = write.send(msg).await {
                            error!("WebSocket 전송 실패: {}", e);
                            break format!("WebSocket 전송 실패: {}", e);
                        }
                    }
                    None => {
                        let _ = write.send(Message::Close(None)).await;
                        break "클라이언트 종료".to_string();
                    }
                }
            }
            _ = ping_interval.tick() => {
                debug!("Ping 전송");
                if let Err(e) = write.send(Message::Ping(vec![])).await {
                    error!("Ping 전송 실패: {}", e);
                    break format!("Ping 전송 실패: {}", e);
                }
            }
        }
    };

    outbound.close();
    *is_connected.write().await = false;
    pending.lock().await.clear();

    warn!(reason = %reason, "브리지 연결 종료");
    let _ = event_tx.send(BrokerEvent::Disconnected(reason));
}

/// 수신 메시지 처리.
async fn dispatch(
    text: &str,
    event_tx: &mpsc::UnboundedSender<BrokerEvent>,
    pending: &tokio::sync::Mutex<PendingReplies>,
) {
    match BridgeMessage::parse(text) {
        Ok(BridgeMessage::Event(event)) => {
            let _ = event_tx.send(event);
        }
        Ok(BridgeMessage::SendAck {
            screen,
            condition_name,
            accepted,
        }) => {
            let waiter = pending.lock().await.take_ack(&screen, &condition_name);
            match waiter {
                Some(tx) => {
                    let _ = tx.send(accepted);
                }
                None => {
                    warn!(screen = %screen, condition = %condition_name, "대기 중인 요청이 없는 SEND_ACK");
                    let _ = event_tx.send(BrokerEvent::Malformed(text.to_string()));
                }
            }
        }
        Ok(BridgeMessage::ConditionList(list)) => {
            let waiter = pending.lock().await.take_list();
            match waiter {
                Some(tx) => {
                    let _ = tx.send(list);
                }
                None => {
                    warn!(count = list.len(), "대기 중인 요청이 없는 CONDITION_LIST");
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "브리지 메시지 해석 실패");
            let _ = event_tx.send(BrokerEvent::Malformed(text.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_ack_fifo_skips_abandoned() {
        let mut pending = PendingReplies::default();
        let abandoned = pending.push_ack("100".into(), "A".into());
        let mut live = pending.push_ack("100".into(), "A".into());
        drop(abandoned);

        let waiter = pending.take_ack("100", "A").unwrap();
        waiter.send(true).unwrap();
        assert!(live.try_recv().unwrap());
        assert!(pending.take_ack("100", "A").is_none());
    }

    #[test]
    fn test_pending_ack_keyed_by_screen_and_name() {
        let mut pending = PendingReplies::default();
        let _a = pending.push_ack("100".into(), "A".into());
        assert!(pending.take_ack("101", "A").is_none());
        assert!(pending.take_ack("100", "B").is_none());
        assert!(pending.take_ack("100", "A").is_some());
    }

    #[tokio::test]
    async fn test_requests_before_connect_fail() {
        let broker = BridgeBroker::new(BridgeConfig::new("ws://127.0.0.1:1"));
        let screen = ScreenId::parse("100").unwrap();
        let err = broker
            .send_condition(&screen, "A", 0, SearchMode::Live)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::NotConnected));
        assert!(broker.take_event_receiver().is_some());
        assert!(broker.take_event_receiver().is_none());
    }
}
