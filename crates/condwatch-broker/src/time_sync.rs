//! 표준시 서버 시각 동기화.
//!
//! KRISS 표준시 서버(`/timeSync.do`)는 `{"result":"YYYYMMDDHHMMSS"}` 형식으로
//! 한국 표준시를 돌려줍니다. 로컬 시계와의 차이를 구해 `OffsetClock`에 적용합니다.

use chrono::{Duration, NaiveDateTime};
use condwatch_core::{Clock, TimeConfig};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{BrokerError, BrokerResult};

/// 서버 응답 시각 형식.
const SERVER_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Deserialize)]
struct TimeSyncResponse {
    result: String,
}

/// KRISS 표준시 클라이언트.
#[derive(Debug, Clone)]
pub struct KrissTimeSync {
    client: reqwest::Client,
    url: String,
}

impl KrissTimeSync {
    /// 새로운 클라이언트 생성.
    pub fn new(url: impl Into<String>, timeout: std::time::Duration) -> BrokerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BrokerError::TimeSync(format!("HTTP 클라이언트 생성 실패: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// 설정 파일의 `[time]` 섹션에서 생성합니다.
    pub fn from_settings(settings: &TimeConfig) -> BrokerResult<Self> {
        Self::new(settings.sync_url.clone(), settings.sync_timeout())
    }

    /// 서버 시각 조회.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch_server_time(&self) -> BrokerResult<NaiveDateTime> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(BrokerError::TimeSync(format!(
                "표준시 서버 응답 코드 {}",
                response.status()
            )));
        }

        let body: TimeSyncResponse = response.json().await?;
        NaiveDateTime::parse_from_str(body.result.trim(), SERVER_TIME_FORMAT).map_err(|e| {
            BrokerError::TimeSync(format!("표준시 형식 오류 {:?}: {}", body.result, e))
        })
    }

    /// 로컬 시계 대비 서버 시각의 오차를 구합니다 (서버 - 로컬).
    pub async fn measure_offset(&self, local: &dyn Clock) -> BrokerResult<Duration> {
        let server = self.fetch_server_time().await?;
        let offset = server - local.now();
        debug!(offset_secs = offset.num_seconds(), "표준시 오차 측정");
        Ok(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use condwatch_core::{parse_timestamp, ManualClock};

    #[tokio::test]
    async fn test_fetch_server_time() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/timeSync.do")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"result":"20240715090003"}"#)
            .create_async()
            .await;

        let sync = KrissTimeSync::new(
            format!("{}/timeSync.do", server.url()),
            std::time::Duration::from_secs(2),
        )
        .unwrap();

        let time = sync.fetch_server_time().await.unwrap();
        assert_eq!(time, parse_timestamp("2024-07-15 09:00:03").unwrap());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_measure_offset() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/timeSync.do")
            .with_status(200)
            .with_body(r#"{"result":"20240715090005"}"#)
            .create_async()
            .await;

        let sync = KrissTimeSync::new(
            format!("{}/timeSync.do", server.url()),
            std::time::Duration::from_secs(2),
        )
        .unwrap();
        let local = ManualClock::new(parse_timestamp("2024-07-15 09:00:00").unwrap());

        let offset = sync.measure_offset(&local).await.unwrap();
        assert_eq!(offset.num_seconds(), 5);
    }

    #[tokio::test]
    async fn test_bad_payload_and_status() {
        let mut server = mockito::Server::new_async().await;
        let _bad = server
            .mock("GET", "/bad")
            .with_status(200)
            .with_body(r#"{"result":"not-a-time"}"#)
            .create_async()
            .await;
        let _down = server
            .mock("GET", "/down")
            .with_status(503)
            .create_async()
            .await;

        let timeout = std::time::Duration::from_secs(2);
        let bad = KrissTimeSync::new(format!("{}/bad", server.url()), timeout).unwrap();
        assert!(matches!(
            bad.fetch_server_time().await,
            Err(BrokerError::TimeSync(_))
        ));

        let down = KrissTimeSync::new(format!("{}/down", server.url()), timeout).unwrap();
        assert!(matches!(
            down.fetch_server_time().await,
            Err(BrokerError::TimeSync(_))
        ));
    }
}
