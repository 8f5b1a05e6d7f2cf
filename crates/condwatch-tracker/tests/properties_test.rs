//! 추적기 속성 테스트

use condwatch_broker::{AckPolicy, BrokerApi, BrokerEvent, SimulatedBroker, SimulationScript};
use condwatch_core::{
    parse_timestamp, ConditionEvent, ManualClock, ScreenId, SearchMode, StockCode,
};
use condwatch_tracker::{ConditionTracker, MemorySink, TrackerContext, TrackerOptions};
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Op {
    Insert(u8),
    Delete(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![(0u8..30).prop_map(Op::Insert), (0u8..30).prop_map(Op::Delete)]
}

fn code(n: u8) -> StockCode {
    StockCode::parse(&format!("{:06}", n)).unwrap()
}

/// 추적기에 순서대로 적용하고 (최종 목록, 표시 싱크 호출 수)를 반환합니다.
fn run_tracker(ops: &[Op]) -> (Vec<StockCode>, usize) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        let broker = Arc::new(SimulatedBroker::new(
            SimulationScript::default().with_ack_policy(AckPolicy::AcceptAll),
        ));
        let mut events = broker.take_event_receiver().unwrap();
        broker.connect().await.unwrap();
        assert_eq!(events.recv().await, Some(BrokerEvent::Login(0)));

        let presentation = Arc::new(MemorySink::new());
        let context = TrackerContext {
            broker: broker.clone(),
            clock: Arc::new(ManualClock::new(parse_timestamp("2024-07-15 09:00:00").unwrap())),
            persistence: Arc::new(MemorySink::new()),
            presentation: presentation.clone(),
            options: TrackerOptions::default(),
        };
        let mut tracker = ConditionTracker::new(ScreenId::parse("100").unwrap(), context);
        tracker
            .send_condition("급등주", 0, SearchMode::Live)
            .await
            .unwrap();

        for op in ops {
            let event = match op {
                Op::Insert(n) => ConditionEvent::insert(code(*n), "급등주", 0),
                Op::Delete(n) => ConditionEvent::delete(code(*n), "급등주", 0),
            };
            tracker.on_condition_event(&event).await;
        }

        let codes = tracker.snapshot().await.into_iter().map(|s| s.code).collect();
        (codes, presentation.presented().len())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// 최종 목록은 마지막 동작이 편입인 종목들이고, 표시 싱크는 실제 변경 횟수만큼만 호출된다.
    #[test]
    fn prop_tracker_membership_is_net_positive(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let mut expected: Vec<StockCode> = Vec::new();
        let mut changes = 0usize;
        for op in &ops {
            match op {
                Op::Insert(n) => {
                    let c = code(*n);
                    if !expected.contains(&c) {
                        expected.push(c);
                        changes += 1;
                    }
                }
                Op::Delete(n) => {
                    let c = code(*n);
                    if expected.contains(&c) {
                        expected.retain(|e| e != &c);
                        changes += 1;
                    }
                }
            }
        }

        let (codes, presented) = run_tracker(&ops);
        prop_assert_eq!(codes, expected);
        prop_assert_eq!(presented, changes);
    }
}
