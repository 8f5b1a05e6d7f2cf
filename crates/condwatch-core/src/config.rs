//! 설정 관리.
//!
//! 기본값 → TOML 파일 → 환경 변수(`CONDWATCH__섹션__키`) 순서로 병합합니다.
//! 모든 필드에 기본값이 있으므로 설정 파일 없이도 실행할 수 있습니다.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::domain::SearchMode;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 브로커 연동 설정
    pub broker: BrokerConfig,
    /// 조건식 추적 설정
    pub tracker: TrackerConfig,
    /// 저장소 설정
    pub storage: StorageConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
    /// 시각 설정
    pub time: TimeConfig,
}

/// 브로커 연동 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerKind {
    /// 외부 어댑터 프로세스와 WebSocket으로 연결
    #[default]
    Bridge,
    /// 스크립트 기반 시뮬레이션
    Simulated,
}

/// 브로커 연동 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// 연동 방식
    pub kind: BrokerKind,
    /// 브리지 어댑터 WebSocket URL
    pub bridge_url: String,
    /// 로그인 결과 대기 시간 (초)
    pub login_timeout_secs: u64,
    /// 브리지 연결 타임아웃 (초)
    pub connect_timeout_secs: u64,
    /// 요청-응답 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// 시뮬레이션 스크립트 경로
    pub script_path: Option<String>,
    /// 이벤트 채널 버퍼 크기
    pub event_buffer: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            kind: BrokerKind::Bridge,
            bridge_url: "ws://127.0.0.1:8765".to_string(),
            login_timeout_secs: 60,
            connect_timeout_secs: 10,
            request_timeout_secs: 10,
            script_path: None,
            event_buffer: 1000,
        }
    }
}

impl BrokerConfig {
    /// 로그인 대기 시간을 Duration으로 반환
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    /// 연결 타임아웃을 Duration으로 반환
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// 요청-응답 타임아웃을 Duration으로 반환
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 조건식 추적 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// 기본 화면번호
    pub screen_id: String,
    /// 기본 조회 방식
    pub search_mode: SearchMode,
    /// 구독 중지 시 추적 목록 초기화 여부
    pub clear_on_stop: bool,
    /// 명령 채널 버퍼 크기
    pub command_buffer: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            screen_id: "100".to_string(),
            search_mode: SearchMode::Live,
            clear_on_stop: false,
            command_buffer: 64,
        }
    }
}

/// 저장소 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite 저장 활성화
    pub enabled: bool,
    /// 세션 DB 파일 디렉토리
    pub data_dir: String,
    /// 이탈한 종목의 행을 남겨둘지 여부
    pub retain_removed: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            data_dir: "data".to_string(),
            retain_removed: false,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
    /// span 진입/종료 이벤트 출력
    pub span_events: bool,
    /// 파일명과 줄 번호 출력
    pub file: bool,
    /// 스레드 ID 출력
    pub thread_ids: bool,
    /// 대상(모듈 경로) 출력
    pub target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            span_events: false,
            file: false,
            thread_ids: true,
            target: true,
        }
    }
}

/// 시각 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeConfig {
    /// 최초 포착 시각의 기준 시간대
    pub timezone: String,
    /// 표준시 서버와 시각 동기화 여부
    pub sync_with_server: bool,
    /// 표준시 서버 URL
    pub sync_url: String,
    /// 동기화 요청 타임아웃 (초)
    pub sync_timeout_secs: u64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            timezone: "Asia/Seoul".to_string(),
            sync_with_server: false,
            sync_url: "http://time2.kriss.re.kr/timeSync.do".to_string(),
            sync_timeout_secs: 5,
        }
    }
}

impl TimeConfig {
    /// 동기화 요청 타임아웃을 Duration으로 반환
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync_timeout_secs)
    }
}

impl AppConfig {
    /// 파일(선택)과 환경 변수에서 설정을 로드합니다.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        // 환경 변수로 오버라이드
        builder = builder.add_source(
            config::Environment::with_prefix("CONDWATCH")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// 기본 경로(`config/default.toml`)가 있으면 읽고, 없으면 기본값으로 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        let default_path = Path::new("config/default.toml");
        if default_path.exists() {
            Self::load(Some(default_path))
        } else {
            Self::load(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.broker.kind, BrokerKind::Bridge);
        assert_eq!(config.broker.login_timeout(), Duration::from_secs(60));
        assert_eq!(config.tracker.screen_id, "100");
        assert_eq!(config.tracker.search_mode, SearchMode::Live);
        assert!(!config.tracker.clear_on_stop);
        assert!(config.storage.enabled);
        assert_eq!(config.time.timezone, "Asia/Seoul");
    }

    #[test]
    fn test_load_from_file_with_partial_sections() {
        let dir = std::env::temp_dir().join(format!("condwatch-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("watch.toml");
        std::fs::write(
            &path,
            r#"
[broker]
kind = "simulated"
login_timeout_secs = 5

[tracker]
screen_id = "0150"
search_mode = "snapshot"
clear_on_stop = true

[logging]
format = "compact"
file = true
thread_ids = false
"#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.broker.kind, BrokerKind::Simulated);
        assert_eq!(config.broker.login_timeout_secs, 5);
        // 지정하지 않은 필드는 기본값 유지
        assert_eq!(config.broker.request_timeout_secs, 10);
        assert_eq!(config.tracker.screen_id, "0150");
        assert_eq!(config.tracker.search_mode, SearchMode::Snapshot);
        assert!(config.tracker.clear_on_stop);
        assert_eq!(config.storage.data_dir, "data");
        assert_eq!(config.logging.format, "compact");
        assert!(config.logging.file);
        assert!(!config.logging.thread_ids);
        assert!(config.logging.target);

        std::fs::remove_dir_all(&dir).ok();
    }
}
