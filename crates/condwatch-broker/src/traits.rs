//! 브로커 trait 정의.

use async_trait::async_trait;
use condwatch_core::{ConditionEvent, ConditionInfo, MarketPhase, ScreenId, SearchMode};
use tokio::sync::mpsc;

use crate::BrokerError;

/// 브로커 작업을 위한 Result 타입.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// 브로커가 비동기로 보내는 콜백.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    /// 로그인 결과 (0: 성공)
    Login(i32),
    /// 조건식 목록 로드 결과 (1: 성공)
    ConditionCatalogLoaded { result: i32, message: String },
    /// 실시간 편입/이탈
    Condition(ConditionEvent),
    /// 장운영 구분
    MarketStatus(MarketPhase),
    /// 전송 계층 연결 끊김
    Disconnected(String),
    /// 해석할 수 없는 메시지 (원문)
    Malformed(String),
}

/// 조건검색 브로커 인터페이스.
///
/// 요청은 즉시 반환하고 결과는 `take_event_receiver`로 받은 채널에 도착합니다.
/// 단, `send_condition`의 승인 여부와 `condition_list`는 동기 응답입니다.
#[async_trait]
pub trait BrokerApi: Send + Sync {
    /// 브로커 이름 반환.
    fn name(&self) -> &str;

    /// 로그인 요청. 결과는 `BrokerEvent::Login`으로 도착합니다.
    async fn connect(&self) -> BrokerResult<()>;

    /// 조건식 목록 로드 요청. 결과는 `BrokerEvent::ConditionCatalogLoaded`로 도착합니다.
    async fn load_condition_catalog(&self) -> BrokerResult<()>;

    /// 로드된 조건식 목록 조회.
    async fn condition_list(&self) -> BrokerResult<Vec<ConditionInfo>>;

    /// 조건검색 요청. 브로커가 승인하면 `true`.
    async fn send_condition(
        &self,
        screen: &ScreenId,
        condition_name: &str,
        condition_index: i32,
        mode: SearchMode,
    ) -> BrokerResult<bool>;

    /// 실시간 조건검색 중지.
    async fn stop_condition(
        &self,
        screen: &ScreenId,
        condition_name: &str,
        condition_index: i32,
    ) -> BrokerResult<()>;

    /// 이벤트 수신 채널 가져오기. 한 번만 가져갈 수 있습니다.
    fn take_event_receiver(&self) -> Option<mpsc::Receiver<BrokerEvent>>;
}
