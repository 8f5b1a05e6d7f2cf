//! 화면 하나의 조건검색 구독 추적기.

use condwatch_broker::BrokerApi;
use condwatch_core::{
    condition_span, Clock, ConditionEvent, ConditionEventKind, ConditionSubscription,
    PersistenceSink, PresentationSink, ScreenId, SearchMode, SubscriptionState, TrackedStock,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn, Instrument};

use crate::membership::{MembershipSet, MembershipView};
use crate::{TrackerError, TrackerResult, TrackerStats};

/// 추적기 옵션.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackerOptions {
    /// 구독 중지 시 추적 목록을 비울지 여부 (기본: 유지)
    pub clear_on_stop: bool,
}

/// 추적기가 공유하는 협력자들.
#[derive(Clone)]
pub struct TrackerContext {
    pub broker: Arc<dyn BrokerApi>,
    pub clock: Arc<dyn Clock>,
    pub persistence: Arc<dyn PersistenceSink>,
    pub presentation: Arc<dyn PresentationSink>,
    pub options: TrackerOptions,
}

/// 이벤트 적용 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// 새로 편입됨
    Inserted(TrackedStock),
    /// 이탈로 제거됨
    Removed(TrackedStock),
    /// 이미 추적 중인 종목의 편입
    Duplicate,
    /// 추적하지 않는 종목의 이탈
    UnknownDelete,
    /// 활성 구독이 아니거나 다른 조건식의 이벤트 (버림)
    Ignored,
}

impl EventOutcome {
    /// 추적 목록이 바뀌었는지 확인.
    pub fn is_change(&self) -> bool {
        matches!(self, EventOutcome::Inserted(_) | EventOutcome::Removed(_))
    }
}

/// 조건검색 구독 추적기.
///
/// 화면번호 하나에 구독 하나를 둡니다 (Idle → Active → Stopped).
/// 중지된 추적기는 같은 화면에서 다시 요청할 수 있습니다.
pub struct ConditionTracker {
    screen: ScreenId,
    context: TrackerContext,
    subscription: Option<ConditionSubscription>,
    membership: Arc<RwLock<MembershipSet>>,
    stats: TrackerStats,
}

impl ConditionTracker {
    pub fn new(screen: ScreenId, context: TrackerContext) -> Self {
        Self {
            screen,
            context,
            subscription: None,
            membership: Arc::new(RwLock::new(MembershipSet::new())),
            stats: TrackerStats::new(),
        }
    }

    pub fn screen(&self) -> &ScreenId {
        &self.screen
    }

    /// 현재 구독 상태. 구독이 없으면 Idle.
    pub fn state(&self) -> SubscriptionState {
        self.subscription
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(SubscriptionState::Idle)
    }

    pub fn subscription(&self) -> Option<&ConditionSubscription> {
        self.subscription.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.state() == SubscriptionState::Active
    }

    /// (조건식 이름, 인덱스)가 현재 구독과 일치하는지 확인.
    pub fn owns(&self, condition_name: &str, condition_index: i32) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(|s| s.matches(condition_name, condition_index))
    }

    pub fn stats(&self) -> &TrackerStats {
        &self.stats
    }

    /// 다른 태스크에서 읽을 수 있는 추적 목록 뷰.
    pub fn view(&self) -> MembershipView {
        MembershipView::new(Arc::clone(&self.membership))
    }

    /// 편입 순서의 추적 목록.
    pub async fn snapshot(&self) -> Vec<TrackedStock> {
        self.membership.read().await.snapshot()
    }

    /// 조건검색 요청.
    ///
    /// 브로커가 거부하면 `SubscriptionRejected`를 반환하고 상태는 바뀌지 않습니다.
    /// 승인되면 빈 추적 목록으로 Active가 되고 저장 싱크를 엽니다.
    pub async fn send_condition(
        &mut self,
        condition_name: &str,
        condition_index: i32,
        mode: SearchMode,
    ) -> TrackerResult<()> {
        let condition_name = condition_name.trim();
        if condition_name.is_empty() {
            return Err(TrackerError::InvalidInput("빈 조건식 이름".to_string()));
        }
        if let Some(active) = self.subscription.as_ref().filter(|s| s.is_active()) {
            return Err(TrackerError::ScreenBusy {
                screen: self.screen.to_string(),
                condition: active.condition_name.clone(),
            });
        }

        let span = condition_span!("send_condition", condition_name, self.screen);
        self.request_subscription(condition_name, condition_index, mode)
            .instrument(span)
            .await
    }

    async fn request_subscription(
        &mut self,
        condition_name: &str,
        condition_index: i32,
        mode: SearchMode,
    ) -> TrackerResult<()> {
        let accepted = self
            .context
            .broker
            .send_condition(&self.screen, condition_name, condition_index, mode)
            .await?;

        if !accepted {
            warn!(index = condition_index, "조건검색 요청 거부");
            return Err(TrackerError::SubscriptionRejected {
                screen: self.screen.to_string(),
                condition: condition_name.to_string(),
            });
        }

        let mut subscription = ConditionSubscription::new(
            self.screen.clone(),
            condition_name,
            condition_index,
            mode,
        );
        subscription.state = SubscriptionState::Active;
        subscription.activated_at = Some(self.context.clock.now());

        let had_members = {
            let mut membership = self.membership.write().await;
            let had_members = !membership.is_empty();
            membership.clear();
            had_members
        };

        info!(index = condition_index, mode = %mode, "조건검색 구독 시작");

        if let Err(e) = self.context.persistence.open(&subscription).await {
            self.stats.sink_failures += 1;
            warn!(error = %e, "저장 싱크 열기 실패");
        }
        self.subscription = Some(subscription);

        if had_members {
            self.notify_presentation().await;
        }
        Ok(())
    }

    /// 실시간 조건검색 중지.
    ///
    /// 추적 목록은 기본적으로 유지하고, `clear_on_stop`이면 비웁니다.
    pub async fn stop_condition(&mut self) -> TrackerResult<()> {
        let Some(subscription) = self.subscription.as_ref().filter(|s| s.is_active()) else {
            return Err(TrackerError::NotActive(self.screen.to_string()));
        };

        self.context
            .broker
            .stop_condition(
                &self.screen,
                &subscription.condition_name,
                subscription.condition_index,
            )
            .await?;

        info!(
            condition = %subscription.condition_name,
            screen = %self.screen,
            "조건검색 구독 중지"
        );
        self.mark_stopped().await;
        Ok(())
    }

    /// 세션이 끊겼을 때 구독을 중지 상태로 바꿉니다. 브로커에는 요청하지 않습니다.
    pub async fn on_session_lost(&mut self) {
        if self.is_active() {
            warn!(screen = %self.screen, "세션 종료로 구독 중지");
            self.mark_stopped().await;
        }
    }

    async fn mark_stopped(&mut self) {
        if let Some(subscription) = self.subscription.as_mut() {
            subscription.state = SubscriptionState::Stopped;
        }
        if self.context.options.clear_on_stop {
            let cleared = {
                let mut membership = self.membership.write().await;
                let had_members = !membership.is_empty();
                membership.clear();
                had_members
            };
            if cleared {
                self.notify_presentation().await;
            }
        }
    }

    /// 편입/이탈 이벤트 적용.
    ///
    /// 활성 구독과 (조건식 이름, 인덱스)가 일치할 때만 적용하고,
    /// 실제로 목록이 바뀐 경우에만 싱크에 알립니다.
    pub async fn on_condition_event(&mut self, event: &ConditionEvent) -> EventOutcome {
        self.stats.events += 1;

        let condition_name = match self.subscription.as_ref() {
            Some(s) if s.is_active() && s.matches(&event.condition_name, event.condition_index) => {
                s.condition_name.clone()
            }
            Some(s) => {
                self.stats.anomalies += 1;
                warn!(
                    screen = %self.screen,
                    state = %s.state,
                    event = %event,
                    "구독과 맞지 않는 조건검색 이벤트 무시"
                );
                return EventOutcome::Ignored;
            }
            None => {
                self.stats.anomalies += 1;
                warn!(screen = %self.screen, event = %event, "구독 전 조건검색 이벤트 무시");
                return EventOutcome::Ignored;
            }
        };

        let outcome = {
            let mut membership = self.membership.write().await;
            match event.kind {
                ConditionEventKind::Insert => {
                    let now = self.context.clock.now();
                    match membership.insert(event.code.clone(), now, &condition_name) {
                        Some(stock) => EventOutcome::Inserted(stock),
                        None => EventOutcome::Duplicate,
                    }
                }
                ConditionEventKind::Delete => match membership.remove(&event.code) {
                    Some(stock) => EventOutcome::Removed(stock),
                    None => EventOutcome::UnknownDelete,
                },
            }
        };

        match &outcome {
            EventOutcome::Inserted(stock) => {
                self.stats.inserts += 1;
                info!(code = %stock.code, first_seen = %stock.first_seen_display(), condition = %condition_name, "종목 편입");
                if let Err(e) = self.context.persistence.record_seen(stock).await {
                    self.stats.sink_failures += 1;
                    warn!(code = %stock.code, error = %e, "편입 저장 실패");
                }
                self.notify_presentation().await;
            }
            EventOutcome::Removed(stock) => {
                self.stats.deletes += 1;
                info!(code = %stock.code, condition = %condition_name, "종목 이탈");
                if let Err(e) = self
                    .context
                    .persistence
                    .record_removed(&condition_name, &stock.code)
                    .await
                {
                    self.stats.sink_failures += 1;
                    warn!(code = %stock.code, error = %e, "이탈 저장 실패");
                }
                self.notify_presentation().await;
            }
            EventOutcome::Duplicate => {
                self.stats.duplicate_inserts += 1;
                debug!(code = %event.code, "이미 추적 중인 종목");
            }
            EventOutcome::UnknownDelete => {
                self.stats.unknown_deletes += 1;
                debug!(code = %event.code, "추적하지 않는 종목의 이탈");
            }
            EventOutcome::Ignored => {}
        }

        outcome
    }

    /// 현재 추적 목록 전체를 저장 싱크에 기록합니다.
    pub async fn flush(&mut self) -> TrackerResult<()> {
        let snapshot = self.snapshot().await;
        if let Err(e) = self.context.persistence.flush_all(&snapshot).await {
            self.stats.sink_failures += 1;
            return Err(e.into());
        }
        debug!(screen = %self.screen, count = snapshot.len(), "추적 목록 저장");
        Ok(())
    }

    async fn notify_presentation(&mut self) {
        let snapshot = self.snapshot().await;
        if let Err(e) = self
            .context
            .presentation
            .on_membership_changed(&snapshot)
            .await
        {
            self.stats.sink_failures += 1;
            warn!(screen = %self.screen, error = %e, "표시 싱크 갱신 실패");
        }
    }
}
