//! 최초 포착 시각을 찍기 위한 시계 추상화.
//!
//! 모든 시각은 초 단위로 절삭된 거래소 현지 시각(`NaiveDateTime`)입니다.

use chrono::{Duration, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;
use std::sync::{Mutex, PoisonError};

use crate::error::{WatchError, WatchResult};

/// 화면과 저장소에 사용하는 시각 형식.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 현재 시각 제공자.
pub trait Clock: Send + Sync {
    /// 초 단위로 절삭된 현재 현지 시각.
    fn now(&self) -> NaiveDateTime;
}

/// 나노초를 버리고 초 단위로 절삭합니다.
pub fn truncate_to_seconds(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// `TIMESTAMP_FORMAT` 문자열을 파싱합니다.
pub fn parse_timestamp(s: &str) -> WatchResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT)
        .map_err(|e| WatchError::InvalidInput(format!("시각 형식 오류 '{}': {}", s, e)))
}

/// 시스템 시계 (지정 시간대 기준).
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    /// 시간대를 지정해 생성합니다.
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// 한국 표준시 기준 시계.
    pub fn seoul() -> Self {
        Self::new(chrono_tz::Asia::Seoul)
    }

    /// IANA 시간대 이름으로 생성합니다 (예: "Asia/Seoul").
    pub fn from_name(name: &str) -> WatchResult<Self> {
        let tz: Tz = name
            .parse()
            .map_err(|e| WatchError::Config(format!("알 수 없는 시간대 '{}': {}", name, e)))?;
        Ok(Self::new(tz))
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::seoul()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        truncate_to_seconds(Utc::now().with_timezone(&self.tz).naive_local())
    }
}

/// 외부 표준시와의 오차를 보정하는 시계.
#[derive(Debug, Clone)]
pub struct OffsetClock<C: Clock> {
    inner: C,
    offset: Duration,
}

impl<C: Clock> OffsetClock<C> {
    /// `inner` 시각에 `offset`을 더하는 시계를 생성합니다.
    pub fn new(inner: C, offset: Duration) -> Self {
        Self { inner, offset }
    }

    /// 적용 중인 오차.
    pub fn offset(&self) -> Duration {
        self.offset
    }
}

impl<C: Clock> Clock for OffsetClock<C> {
    fn now(&self) -> NaiveDateTime {
        truncate_to_seconds(self.inner.now() + self.offset)
    }
}

/// 수동으로 조작하는 시계. 테스트와 재생(replay)에 사용합니다.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    /// 시작 시각을 지정해 생성합니다.
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(truncate_to_seconds(start)),
        }
    }

    /// 시각을 설정합니다.
    pub fn set(&self, at: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = truncate_to_seconds(at);
    }

    /// 시각을 앞으로 이동합니다.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = truncate_to_seconds(*now + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
