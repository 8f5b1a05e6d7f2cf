//! 이벤트 처리 통계.

use serde::{Deserialize, Serialize};

/// 추적기 이벤트 처리 통계
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerStats {
    /// 받은 조건검색 이벤트 수
    pub events: u64,
    /// 실제 편입 수
    pub inserts: u64,
    /// 실제 이탈 수
    pub deletes: u64,
    /// 이미 추적 중인 종목의 편입
    pub duplicate_inserts: u64,
    /// 추적하지 않는 종목의 이탈
    pub unknown_deletes: u64,
    /// 버린 이벤트 (구독 없음, 다른 조건식, 해석 실패 등)
    pub anomalies: u64,
    /// 싱크 호출 실패
    pub sink_failures: u64,
}

impl TrackerStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 다른 통계를 더합니다.
    pub fn merge(&mut self, other: &TrackerStats) {
        self.events += other.events;
        self.inserts += other.inserts;
        self.deletes += other.deletes;
        self.duplicate_inserts += other.duplicate_inserts;
        self.unknown_deletes += other.unknown_deletes;
        self.anomalies += other.anomalies;
        self.sink_failures += other.sink_failures;
    }

    /// 추적 목록을 바꾼 이벤트 비율 (%)
    pub fn effective_rate(&self) -> f64 {
        if self.events == 0 {
            0.0
        } else {
            ((self.inserts + self.deletes) as f64 / self.events as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, scope: &str) {
        tracing::info!(
            scope = scope,
            events = self.events,
            inserts = self.inserts,
            deletes = self.deletes,
            duplicate_inserts = self.duplicate_inserts,
            unknown_deletes = self.unknown_deletes,
            anomalies = self.anomalies,
            sink_failures = self.sink_failures,
            effective_rate = format!("{:.1}%", self.effective_rate()),
            "조건검색 처리 통계"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_and_rate() {
        let mut a = TrackerStats {
            events: 4,
            inserts: 2,
            deletes: 1,
            duplicate_inserts: 1,
            ..Default::default()
        };
        let b = TrackerStats {
            events: 1,
            anomalies: 1,
            ..Default::default()
        };
        a.merge(&b);

        assert_eq!(a.events, 5);
        assert_eq!(a.anomalies, 1);
        assert!((a.effective_rate() - 60.0).abs() < f64::EPSILON);
        assert_eq!(TrackerStats::new().effective_rate(), 0.0);
    }
}
