//! SQLite 세션 저장소.
//!
//! # 파일 구성
//!
//! - 세션 날짜와 조건식마다 `<data_dir>/<YYYYMMDD>_<조건식>.db` 파일 하나
//! - 테이블 `tracked_stocks(code TEXT PRIMARY KEY, first_seen TEXT, cond_name TEXT)`
//! - 시각은 `YYYY-MM-DD HH:MM:SS` 문자열로 저장
//!
//! `retain_removed`가 꺼져 있으면 파일 내용은 항상 현재 추적 목록과 같습니다.
//! 켜져 있으면 이탈한 종목의 행도 남아 그날 한 번이라도 편입된 종목 목록이 됩니다.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::Row;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use condwatch_core::config::StorageConfig;
use condwatch_core::{
    parse_timestamp, ConditionSubscription, PersistenceSink, StockCode, TrackedStock, WatchResult,
};

use crate::error::{Result, StorageError};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS tracked_stocks (
    code TEXT PRIMARY KEY,
    first_seen TEXT NOT NULL,
    cond_name TEXT NOT NULL
);";

const UPSERT: &str =
    "INSERT OR REPLACE INTO tracked_stocks (code, first_seen, cond_name) VALUES (?, ?, ?)";

/// 파일 이름에 쓸 수 없는 문자를 `_`로 바꿉니다.
///
/// 공백과 제어 문자도 바꾸며, 결과가 비면 `condition`을 사용합니다.
pub fn sanitize_condition_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '.' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        "condition".to_string()
    } else {
        sanitized
    }
}

/// 세션 파일 이름 (`YYYYMMDD_<조건식>.db`).
pub fn session_file_name(date: NaiveDate, condition_name: &str) -> String {
    format!(
        "{}_{}.db",
        date.format("%Y%m%d"),
        sanitize_condition_name(condition_name)
    )
}

/// 세션 DB 파일 하나.
#[derive(Debug, Clone)]
pub struct SessionStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl SessionStore {
    /// 파일이 없으면 만들고 테이블을 준비합니다.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let store = Self::connect(path, true).await?;
        sqlx::query(CREATE_TABLE).execute(&store.pool).await?;
        Ok(store)
    }

    /// 기존 파일을 엽니다. 파일이 없으면 `NotFound`를 반환합니다.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await? {
            return Err(StorageError::NotFound(path.display().to_string()));
        }
        Self::connect(path, false).await
    }

    async fn connect(path: &Path, create: bool) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(create)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .synchronous(SqliteSynchronous::Normal);

        // 조건식 하나의 쓰기 빈도는 낮음
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await
            .map_err(|e| {
                StorageError::ConnectionError(format!("{}: {}", path.display(), e))
            })?;

        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// DB 파일 경로.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 종목 한 건을 upsert합니다.
    pub async fn upsert(&self, stock: &TrackedStock) -> Result<()> {
        sqlx::query(UPSERT)
            .bind(stock.code.as_str())
            .bind(stock.first_seen_display())
            .bind(&stock.condition_name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// 목록 전체를 한 트랜잭션으로 기록합니다.
    ///
    /// `replace`가 참이면 기존 행을 모두 지우고 목록으로 교체합니다.
    pub async fn write_all(&self, stocks: &[TrackedStock], replace: bool) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if replace {
            sqlx::query("DELETE FROM tracked_stocks")
                .execute(&mut *tx)
                .await?;
        }

        for stock in stocks {
            sqlx::query(UPSERT)
                .bind(stock.code.as_str())
                .bind(stock.first_seen_display())
                .bind(&stock.condition_name)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// 종목 행을 삭제합니다. 삭제된 행이 있었는지 반환합니다.
    pub async fn delete(&self, code: &StockCode) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tracked_stocks WHERE code = ?")
            .bind(code.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// 모든 행을 지웁니다.
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM tracked_stocks")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// 저장된 행을 최초 포착 시각 순서로 읽습니다.
    pub async fn read_all(&self) -> Result<Vec<TrackedStock>> {
        let rows = sqlx::query(
            "SELECT code, first_seen, cond_name FROM tracked_stocks ORDER BY first_seen, code",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<TrackedStock> {
                let code: String = row.try_get("code")?;
                let first_seen: String = row.try_get("first_seen")?;
                let cond_name: String = row.try_get("cond_name")?;

                let code = StockCode::parse(&code)
                    .map_err(|e| StorageError::InvalidData(e.to_string()))?;
                let first_seen = parse_timestamp(&first_seen)
                    .map_err(|e| StorageError::InvalidData(e.to_string()))?;
                Ok(TrackedStock::new(code, first_seen, cond_name))
            })
            .collect()
    }

    /// 연결 풀을 닫습니다.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// 조건식별 세션 파일에 기록하는 저장 싱크.
pub struct SqlitePersistenceSink {
    data_dir: PathBuf,
    retain_removed: bool,
    /// 조건식 이름 → 현재 세션 저장소
    stores: Mutex<HashMap<String, SessionStore>>,
}

impl SqlitePersistenceSink {
    /// `data_dir` 아래에 세션 파일을 만드는 싱크를 생성합니다.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            retain_removed: false,
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// 이탈한 종목의 행을 남길지 설정합니다.
    pub fn with_retain_removed(mut self, retain: bool) -> Self {
        self.retain_removed = retain;
        self
    }

    /// 설정 파일의 `[storage]` 섹션에서 생성합니다.
    pub fn from_settings(settings: &StorageConfig) -> Self {
        Self::new(&settings.data_dir).with_retain_removed(settings.retain_removed)
    }

    /// 세션 파일 디렉토리.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// 조건식의 현재 세션 저장소.
    pub async fn store(&self, condition_name: &str) -> Option<SessionStore> {
        self.stores.lock().await.get(condition_name).cloned()
    }

    /// 모든 세션 저장소를 닫습니다.
    pub async fn close_all(&self) {
        let stores: Vec<SessionStore> = self.stores.lock().await.drain().map(|(_, s)| s).collect();
        for store in stores {
            store.close().await;
        }
    }

    /// 날짜에 맞는 저장소를 돌려줍니다. 날짜가 바뀌었으면 새 파일로 교체합니다.
    async fn store_for(&self, condition_name: &str, date: NaiveDate) -> Result<SessionStore> {
        let path = self.data_dir.join(session_file_name(date, condition_name));

        let mut stores = self.stores.lock().await;
        if let Some(existing) = stores.get(condition_name) {
            if existing.path() == path {
                return Ok(existing.clone());
            }
        }

        let store = SessionStore::create(&path).await?;
        info!(condition = condition_name, path = %path.display(), "세션 저장소 열림");
        if let Some(previous) = stores.insert(condition_name.to_string(), store.clone()) {
            previous.close().await;
        }
        Ok(store)
    }
}

#[async_trait]
impl PersistenceSink for SqlitePersistenceSink {
    #[instrument(skip(self, subscription), fields(condition = %subscription.condition_name))]
    async fn open(&self, subscription: &ConditionSubscription) -> WatchResult<()> {
        let date = subscription
            .activated_at
            .map(|at| at.date())
            .unwrap_or_else(|| Local::now().date_naive());

        let store = self.store_for(&subscription.condition_name, date).await?;

        // 새 구독은 빈 추적 목록에서 시작
        if !self.retain_removed {
            store.clear().await?;
        }
        Ok(())
    }

    async fn record_seen(&self, stock: &TrackedStock) -> WatchResult<()> {
        let store = match self.store(&stock.condition_name).await {
            Some(store) => store,
            None => {
                warn!(condition = %stock.condition_name, "열리지 않은 조건식, 세션 저장소 생성");
                self.store_for(&stock.condition_name, stock.first_seen.date())
                    .await?
            }
        };

        store.upsert(stock).await?;
        debug!(code = %stock.code, condition = %stock.condition_name, "편입 기록");
        Ok(())
    }

    async fn record_removed(&self, condition_name: &str, code: &StockCode) -> WatchResult<()> {
        if self.retain_removed {
            return Ok(());
        }

        let Some(store) = self.store(condition_name).await else {
            warn!(condition = condition_name, code = %code, "세션 저장소 없음, 이탈 기록 생략");
            return Ok(());
        };

        let deleted = store.delete(code).await?;
        debug!(code = %code, condition = condition_name, deleted, "이탈 기록");
        Ok(())
    }

    async fn flush_all(&self, snapshot: &[TrackedStock]) -> WatchResult<()> {
        let Some(first) = snapshot.first() else {
            debug!("빈 추적 목록, 저장 생략");
            return Ok(());
        };

        let store = match self.store(&first.condition_name).await {
            Some(store) => store,
            None => self.store_for(&first.condition_name, first.first_seen.date()).await?,
        };

        store.write_all(snapshot, !self.retain_removed).await?;
        info!(
            condition = %first.condition_name,
            count = snapshot.len(),
            path = %store.path().display(),
            "추적 목록 저장"
        );
        Ok(())
    }
}
