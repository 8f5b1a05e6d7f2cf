//! 브리지 클라이언트 통합 테스트 (로컬 가짜 어댑터 사용)

use condwatch_broker::{BridgeBroker, BridgeConfig, BrokerApi, BrokerError, BrokerEvent};
use condwatch_core::{ConditionEventKind, MarketPhase, ScreenId, SearchMode};
use futures::{SinkExt, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

type AdapterSocket = WebSocketStream<TcpStream>;

/// 연결 하나를 받아 `handler`로 처리하는 가짜 어댑터를 띄웁니다.
async fn spawn_adapter<F, Fut>(handler: F) -> String
where
    F: FnOnce(AdapterSocket) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();
        handler(ws).await;
    });
    format!("ws://{}", addr)
}

async fn next_text(ws: &mut AdapterSocket) -> Option<String> {
    while let Some(msg) = ws.next().await {
        match msg {
            Ok(Message::Text(text)) => return Some(text),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            _ => return None,
        }
    }
    None
}

async fn reply(ws: &mut AdapterSocket, text: &str) {
    ws.send(Message::Text(text.to_string())).await.unwrap();
}

fn config(url: String) -> BridgeConfig {
    BridgeConfig::new(url).with_request_timeout(Duration::from_millis(500))
}

async fn recv(rx: &mut tokio::sync::mpsc::Receiver<BrokerEvent>) -> BrokerEvent {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("event timeout")
        .expect("channel closed")
}

fn screen() -> ScreenId {
    ScreenId::parse("100").unwrap()
}

#[tokio::test]
async fn test_login_subscribe_and_events() {
    let url = spawn_adapter(|mut ws| async move {
        assert_eq!(next_text(&mut ws).await.as_deref(), Some("CONNECT"));
        reply(&mut ws, "LOGIN|0").await;

        assert_eq!(next_text(&mut ws).await.as_deref(), Some("LIST_CONDITIONS"));
        reply(&mut ws, "CONDITION_LIST|000^급등주;001^거래량;").await;

        assert_eq!(
            next_text(&mut ws).await.as_deref(),
            Some("SEND_CONDITION|100|급등주|0|1")
        );
        reply(&mut ws, "SEND_ACK|100|급등주|1").await;
        reply(&mut ws, "REAL_CONDITION|005930|I|급등주|000").await;
        reply(&mut ws, "MARKET_STATUS|0").await;

        // 클라이언트가 닫을 때까지 유지
        while next_text(&mut ws).await.is_some() {}
    })
    .await;

    let broker = BridgeBroker::new(config(url));
    let mut rx = broker.take_event_receiver().unwrap();

    broker.connect().await.unwrap();
    assert_eq!(recv(&mut rx).await, BrokerEvent::Login(0));
    assert!(broker.is_connected().await);

    let list = broker.condition_list().await.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].name, "급등주");

    let accepted = broker
        .send_condition(&screen(), "급등주", 0, SearchMode::Live)
        .await
        .unwrap();
    assert!(accepted);

    match recv(&mut rx).await {
        BrokerEvent::Condition(event) => {
            assert_eq!(event.code.as_str(), "005930");
            assert_eq!(event.kind, ConditionEventKind::Insert);
            assert_eq!(event.condition_index, 0);
        }
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(
        recv(&mut rx).await,
        BrokerEvent::MarketStatus(MarketPhase::PreOpen)
    );
}

#[tokio::test]
async fn test_rejected_ack() {
    let url = spawn_adapter(|mut ws| async move {
        next_text(&mut ws).await;
        reply(&mut ws, "LOGIN|0").await;
        next_text(&mut ws).await;
        reply(&mut ws, "SEND_ACK|100|급등주|0").await;
        while next_text(&mut ws).await.is_some() {}
    })
    .await;

    let broker = BridgeBroker::new(config(url));
    let mut rx = broker.take_event_receiver().unwrap();
    broker.connect().await.unwrap();
    recv(&mut rx).await;

    let accepted = broker
        .send_condition(&screen(), "급등주", 0, SearchMode::Live)
        .await
        .unwrap();
    assert!(!accepted);
}

#[tokio::test]
async fn test_ack_timeout() {
    let url = spawn_adapter(|mut ws| async move {
        next_text(&mut ws).await;
        reply(&mut ws, "LOGIN|0").await;
        // SEND_CONDITION에 응답하지 않음
        while next_text(&mut ws).await.is_some() {}
    })
    .await;

    let broker = BridgeBroker::new(config(url));
    let mut rx = broker.take_event_receiver().unwrap();
    broker.connect().await.unwrap();
    recv(&mut rx).await;

    let err = broker
        .send_condition(&screen(), "급등주", 0, SearchMode::Live)
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::Timeout(_)));
}

#[tokio::test]
async fn test_malformed_frame_and_disconnect() {
    let url = spawn_adapter(|mut ws| async move {
        next_text(&mut ws).await;
        reply(&mut ws, "LOGIN|0").await;
        reply(&mut ws, "GARBAGE|1|2").await;
        ws.close(None).await.ok();
    })
    .await;

    let broker = BridgeBroker::new(config(url));
    let mut rx = broker.take_event_receiver().unwrap();
    broker.connect().await.unwrap();

    assert_eq!(recv(&mut rx).await, BrokerEvent::Login(0));
    assert_eq!(
        recv(&mut rx).await,
        BrokerEvent::Malformed("GARBAGE|1|2".to_string())
    );
    assert!(matches!(recv(&mut rx).await, BrokerEvent::Disconnected(_)));
    assert!(!broker.is_connected().await);

    let err = broker.load_condition_catalog().await.unwrap_err();
    assert!(err.is_connection_lost());
}

#[tokio::test]
async fn test_ack_after_more_events_than_buffer() {
    const BURST: usize = 50;

    let url = spawn_adapter(|mut ws| async move {
        next_text(&mut ws).await;
        reply(&mut ws, "LOGIN|0").await;

        assert_eq!(
            next_text(&mut ws).await.as_deref(),
            Some("SEND_CONDITION|100|급등주|0|1")
        );
        // 응답 전에 초기 편입 목록이 먼저 도착하는 경우
        for i in 1..=BURST {
            reply(&mut ws, &format!("REAL_CONDITION|{:06}|I|급등주|000", i)).await;
        }
        reply(&mut ws, "SEND_ACK|100|급등주|1").await;
        while next_text(&mut ws).await.is_some() {}
    })
    .await;

    let mut bridge_config = BridgeConfig::new(url).with_request_timeout(Duration::from_secs(2));
    bridge_config.event_buffer = 4;
    let broker = BridgeBroker::new(bridge_config);
    let mut rx = broker.take_event_receiver().unwrap();
    broker.connect().await.unwrap();

    // 이벤트 채널을 읽지 않은 채로 응답을 기다림
    let accepted = broker
        .send_condition(&screen(), "급등주", 0, SearchMode::Live)
        .await
        .unwrap();
    assert!(accepted);

    assert_eq!(recv(&mut rx).await, BrokerEvent::Login(0));
    for i in 1..=BURST {
        match recv(&mut rx).await {
            BrokerEvent::Condition(event) => {
                assert_eq!(event.code.as_str(), format!("{:06}", i));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_connect_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let broker = BridgeBroker::new(config(format!("ws://{}", addr)));
    let err = broker.connect().await.unwrap_err();
    assert!(matches!(err, BrokerError::NetworkError(_)));
}
