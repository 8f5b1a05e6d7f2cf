//! 편입 순서를 유지하는 추적 종목 집합.

use chrono::NaiveDateTime;
use condwatch_core::{StockCode, TrackedStock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// 종목코드로 중복을 제거하고 처음 편입된 순서를 유지하는 집합.
///
/// 이탈 후 다시 편입된 종목은 맨 뒤로 가고 최초 포착 시각도 새로 찍힙니다.
#[derive(Debug, Default, Clone)]
pub struct MembershipSet {
    entries: BTreeMap<u64, TrackedStock>,
    positions: HashMap<StockCode, u64>,
    next_seq: u64,
}

impl MembershipSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 새 종목이면 추가하고 추가된 항목을 반환합니다. 이미 있으면 `None`.
    pub fn insert(
        &mut self,
        code: StockCode,
        first_seen: NaiveDateTime,
        condition_name: &str,
    ) -> Option<TrackedStock> {
        if self.positions.contains_key(&code) {
            return None;
        }
        let seq = self.next_seq;
        self.next_seq += 1;

        let stock = TrackedStock::new(code.clone(), first_seen, condition_name);
        self.positions.insert(code, seq);
        self.entries.insert(seq, stock.clone());
        Some(stock)
    }

    /// 종목을 제거하고 제거된 항목을 반환합니다. 없으면 `None`.
    pub fn remove(&mut self, code: &StockCode) -> Option<TrackedStock> {
        let seq = self.positions.remove(code)?;
        self.entries.remove(&seq)
    }

    pub fn contains(&self, code: &StockCode) -> bool {
        self.positions.contains_key(code)
    }

    pub fn get(&self, code: &StockCode) -> Option<&TrackedStock> {
        self.positions.get(code).and_then(|seq| self.entries.get(seq))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.positions.clear();
    }

    /// 편입 순서의 전체 목록.
    pub fn snapshot(&self) -> Vec<TrackedStock> {
        self.entries.values().cloned().collect()
    }

    /// 편입 순서의 종목코드 목록.
    pub fn codes(&self) -> Vec<StockCode> {
        self.entries.values().map(|s| s.code.clone()).collect()
    }
}

/// 추적 목록 읽기 전용 뷰.
///
/// 추적기만 쓰고 다른 태스크는 이 뷰로 동시에 읽습니다.
#[derive(Debug, Clone)]
pub struct MembershipView {
    inner: Arc<RwLock<MembershipSet>>,
}

impl MembershipView {
    pub(crate) fn new(inner: Arc<RwLock<MembershipSet>>) -> Self {
        Self { inner }
    }

    pub async fn snapshot(&self) -> Vec<TrackedStock> {
        self.inner.read().await.snapshot()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn contains(&self, code: &StockCode) -> bool {
        self.inner.read().await.contains(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use condwatch_core::parse_timestamp;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn code(s: &str) -> StockCode {
        StockCode::parse(s).unwrap()
    }

    fn at(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_duplicate_insert_keeps_first_seen() {
        let mut set = MembershipSet::new();
        assert!(set.insert(code("005930"), at("2024-07-15 09:00:00"), "급등주").is_some());
        assert!(set.insert(code("005930"), at("2024-07-15 09:05:00"), "급등주").is_none());

        assert_eq!(set.len(), 1);
        assert_eq!(
            set.get(&code("005930")).unwrap().first_seen,
            at("2024-07-15 09:00:00")
        );
    }

    #[test]
    fn test_remove_untracked_is_noop() {
        let mut set = MembershipSet::new();
        set.insert(code("005930"), at("2024-07-15 09:00:00"), "급등주");
        assert!(set.remove(&code("000660")).is_none());
        assert_eq!(set.codes(), vec![code("005930")]);
    }

    #[test]
    fn test_reinsert_moves_to_end() {
        let mut set = MembershipSet::new();
        set.insert(code("A1"), at("2024-07-15 09:00:00"), "c");
        set.insert(code("B2"), at("2024-07-15 09:00:01"), "c");
        set.remove(&code("A1"));
        set.insert(code("A1"), at("2024-07-15 09:00:02"), "c");

        assert_eq!(set.codes(), vec![code("B2"), code("A1")]);
        assert_eq!(set.get(&code("A1")).unwrap().first_seen, at("2024-07-15 09:00:02"));
    }

    #[test]
    fn test_bulk_insert_then_delete_first_half() {
        let mut set = MembershipSet::new();
        let start = at("2024-07-15 09:00:00");
        let codes: Vec<StockCode> = (0..1000).map(|i| code(&format!("{:06}", i))).collect();

        for (i, c) in codes.iter().enumerate() {
            set.insert(c.clone(), start + chrono::Duration::seconds(i as i64), "c");
        }
        for c in &codes[..500] {
            set.remove(c);
        }

        assert_eq!(set.codes(), codes[500..].to_vec());
    }

    #[tokio::test]
    async fn test_view_reads_shared_set() {
        let shared = Arc::new(RwLock::new(MembershipSet::new()));
        let view = MembershipView::new(Arc::clone(&shared));
        assert!(view.is_empty().await);

        shared
            .write()
            .await
            .insert(code("005930"), at("2024-07-15 09:00:00"), "c");
        assert_eq!(view.len().await, 1);
        assert!(view.contains(&code("005930")).await);
    }

    proptest! {
        /// 임의의 편입/이탈 순서 뒤 집합은 "마지막 동작이 편입"인 종목과 같고,
        /// 순서는 마지막 (재)편입 시점 순서와 같다.
        #[test]
        fn prop_membership_is_net_positive(ops in prop::collection::vec((0u8..20, any::<bool>()), 0..300)) {
            let mut set = MembershipSet::new();
            let mut expected: Vec<StockCode> = Vec::new();
            let start = at("2024-07-15 09:00:00");

            for (i, (n, is_insert)) in ops.iter().enumerate() {
                let c = code(&format!("{:06}", n));
                let now = start + chrono::Duration::seconds(i as i64);
                if *is_insert {
                    set.insert(c.clone(), now, "c");
                    if !expected.contains(&c) {
                        expected.push(c);
                    }
                } else {
                    set.remove(&c);
                    expected.retain(|e| e != &c);
                }
            }

            prop_assert_eq!(set.codes(), expected.clone());
            let unique: HashSet<_> = set.codes().into_iter().collect();
            prop_assert_eq!(unique.len(), set.len());
        }
    }
}
