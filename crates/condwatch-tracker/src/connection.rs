//! 브로커 세션 연결 관리.
//!
//! 로그인 결과는 비동기 콜백으로 도착하므로 상태를 `watch` 채널로 공개하고,
//! 제한 시간이 있는 대기를 제공합니다.

use condwatch_broker::BrokerApi;
use condwatch_core::{ConnectionState, LoginOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::TrackerResult;

/// 브로커 세션 수명주기 관리자.
///
/// 로그인에 실패해도 자동으로 재시도하지 않습니다.
pub struct ConnectionManager {
    broker: Arc<dyn BrokerApi>,
    state_tx: watch::Sender<ConnectionState>,
}

impl ConnectionManager {
    pub fn new(broker: Arc<dyn BrokerApi>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self { broker, state_tx }
    }

    /// 최근 상태. 한 번의 왕복만큼 늦을 수 있습니다.
    pub fn current_state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// 상태 변경 구독.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// 연결 요청. 결과를 기다리지 않습니다.
    ///
    /// 전송 계층이 요청을 바로 거부하면 Disconnected로 되돌리고 에러를 반환합니다.
    #[instrument(skip(self), fields(broker = self.broker.name()))]
    pub async fn connect(&self) -> TrackerResult<()> {
        self.state_tx.send_replace(ConnectionState::Connecting);
        info!("브로커 로그인 요청");

        if let Err(e) = self.broker.connect().await {
            self.state_tx.send_replace(ConnectionState::Disconnected);
            warn!(error = %e, "브로커 로그인 요청 실패");
            return Err(e.into());
        }
        Ok(())
    }

    /// 로그인 결과 콜백 처리. 적용되었으면 `true`.
    ///
    /// Connecting이 아닐 때 도착한 결과는 프로토콜 이상으로 보고 무시합니다.
    pub fn on_login_result(&self, code: i32) -> bool {
        let mut previous = ConnectionState::Connecting;
        let applied = self.state_tx.send_if_modified(|state| {
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::from_login_code(code);
                true
            } else {
                previous = *state;
                false
            }
        });

        if applied {
            match ConnectionState::from_login_code(code) {
                ConnectionState::Connected => info!("로그인 성공"),
                _ => warn!(code, "로그인 실패"),
            }
        } else {
            warn!(code, state = %previous, "요청하지 않은 로그인 결과 무시");
        }
        applied
    }

    /// 전송 계층 연결 끊김 처리.
    pub fn on_disconnected(&self, reason: &str) {
        let previous = self.state_tx.send_replace(ConnectionState::Disconnected);
        if previous != ConnectionState::Disconnected {
            warn!(reason, previous = %previous, "브로커 세션 연결 끊김");
        }
    }

    /// 로그인 결과를 최대 `timeout` 동안 기다립니다.
    ///
    /// 시간이 초과되어도 상태는 Connecting으로 남아 늦게 온 결과가 반영됩니다.
    pub async fn wait_for_login(&self, timeout: Duration) -> LoginOutcome {
        let mut rx = self.state_tx.subscribe();
        let settled = tokio::time::timeout(timeout, rx.wait_for(ConnectionState::is_settled))
            .await
            .map(|r| r.map(|state| *state));

        match settled {
            Ok(Ok(ConnectionState::Connected)) => LoginOutcome::Connected,
            Ok(Ok(ConnectionState::Failed(code))) => LoginOutcome::Failed(code),
            _ => {
                warn!(timeout_secs = timeout.as_secs_f64(), "로그인 응답 시간 초과");
                LoginOutcome::TimedOut
            }
        }
    }

    /// 연결 요청 후 결과를 기다립니다.
    pub async fn connect_and_wait(&self, timeout: Duration) -> TrackerResult<LoginOutcome> {
        self.connect().await?;
        Ok(self.wait_for_login(timeout).await)
    }
}
