//! SQLite 저장 싱크 통합 테스트

use condwatch_core::{
    parse_timestamp, ConditionSubscription, PersistenceSink, ScreenId, SearchMode, StockCode,
    TrackedStock,
};
use condwatch_storage::{SessionStore, SqlitePersistenceSink, StorageError};
use std::path::PathBuf;

fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("condwatch-storage-{}", uuid::Uuid::new_v4()))
}

fn stock(code: &str, at: &str, condition: &str) -> TrackedStock {
    TrackedStock::new(
        StockCode::parse(code).unwrap(),
        parse_timestamp(at).unwrap(),
        condition,
    )
}

fn subscription(condition: &str, at: &str) -> ConditionSubscription {
    let mut sub = ConditionSubscription::new(
        ScreenId::parse("100").unwrap(),
        condition,
        3,
        SearchMode::Live,
    );
    sub.activated_at = Some(parse_timestamp(at).unwrap());
    sub
}

fn codes(stocks: &[TrackedStock]) -> Vec<&str> {
    stocks.iter().map(|s| s.code.as_str()).collect()
}

#[tokio::test]
async fn test_open_creates_dated_session_file() {
    let dir = temp_dir();
    let sink = SqlitePersistenceSink::new(&dir);

    sink.open(&subscription("급등 주", "2024-07-15 08:59:30"))
        .await
        .unwrap();

    let path = dir.join("20240715_급등_주.db");
    assert!(path.exists());
    assert_eq!(sink.store("급등 주").await.unwrap().path(), path);

    sink.close_all().await;
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_seen_and_removed_are_reflected() {
    let dir = temp_dir();
    let sink = SqlitePersistenceSink::new(&dir);
    sink.open(&subscription("급등주", "2024-07-15 09:00:00"))
        .await
        .unwrap();

    sink.record_seen(&stock("005930", "2024-07-15 09:00:01", "급등주"))
        .await
        .unwrap();
    sink.record_seen(&stock("000660", "2024-07-15 09:00:05", "급등주"))
        .await
        .unwrap();
    // 같은 종목 재기록은 upsert
    sink.record_seen(&stock("005930", "2024-07-15 09:00:01", "급등주"))
        .await
        .unwrap();
    sink.record_removed("급등주", &StockCode::parse("000660").unwrap())
        .await
        .unwrap();

    let rows = sink.store("급등주").await.unwrap().read_all().await.unwrap();
    assert_eq!(codes(&rows), vec!["005930"]);
    assert_eq!(rows[0].first_seen_display(), "2024-07-15 09:00:01");
    assert_eq!(rows[0].condition_name, "급등주");

    sink.close_all().await;
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_retain_removed_keeps_rows() {
    let dir = temp_dir();
    let sink = SqlitePersistenceSink::new(&dir).with_retain_removed(true);
    sink.open(&subscription("급등주", "2024-07-15 09:00:00"))
        .await
        .unwrap();

    sink.record_seen(&stock("005930", "2024-07-15 09:00:01", "급등주"))
        .await
        .unwrap();
    sink.record_removed("급등주", &StockCode::parse("005930").unwrap())
        .await
        .unwrap();

    let rows = sink.store("급등주").await.unwrap().read_all().await.unwrap();
    assert_eq!(codes(&rows), vec!["005930"]);

    sink.close_all().await;
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_flush_all_replaces_contents() {
    let dir = temp_dir();
    let sink = SqlitePersistenceSink::new(&dir);
    sink.open(&subscription("급등주", "2024-07-15 09:00:00"))
        .await
        .unwrap();
    sink.record_seen(&stock("111111", "2024-07-15 09:00:01", "급등주"))
        .await
        .unwrap();

    let snapshot = vec![
        stock("005930", "2024-07-15 09:00:02", "급등주"),
        stock("000660", "2024-07-15 09:00:03", "급등주"),
    ];
    sink.flush_all(&snapshot).await.unwrap();

    let rows = sink.store("급등주").await.unwrap().read_all().await.unwrap();
    assert_eq!(rows, snapshot);

    // 빈 목록은 아무 것도 바꾸지 않음
    sink.flush_all(&[]).await.unwrap();
    let rows = sink.store("급등주").await.unwrap().read_all().await.unwrap();
    assert_eq!(rows.len(), 2);

    sink.close_all().await;
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_reopen_same_day_starts_empty() {
    let dir = temp_dir();
    let sink = SqlitePersistenceSink::new(&dir);
    sink.open(&subscription("급등주", "2024-07-15 09:00:00"))
        .await
        .unwrap();
    sink.record_seen(&stock("005930", "2024-07-15 09:00:01", "급등주"))
        .await
        .unwrap();

    sink.open(&subscription("급등주", "2024-07-15 10:30:00"))
        .await
        .unwrap();
    let rows = sink.store("급등주").await.unwrap().read_all().await.unwrap();
    assert!(rows.is_empty());

    sink.close_all().await;
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_seen_without_open_creates_store_lazily() {
    let dir = temp_dir();
    let sink = SqlitePersistenceSink::new(&dir);

    sink.record_seen(&stock("005930", "2024-07-16 09:10:00", "신고가"))
        .await
        .unwrap();

    assert!(dir.join("20240716_신고가.db").exists());
    // 열린 적 없는 조건식의 이탈은 무시
    sink.record_removed("없는조건", &StockCode::parse("005930").unwrap())
        .await
        .unwrap();

    sink.close_all().await;
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_session_store_read_back() {
    let dir = temp_dir();
    let path = dir.join("20240715_급등주.db");
    {
        let store = SessionStore::create(&path).await.unwrap();
        store
            .write_all(
                &[
                    stock("000660", "2024-07-15 09:00:05", "급등주"),
                    stock("005930", "2024-07-15 09:00:01", "급등주"),
                ],
                false,
            )
            .await
            .unwrap();
        store.close().await;
    }

    let store = SessionStore::open(&path).await.unwrap();
    let rows = store.read_all().await.unwrap();
    // 최초 포착 시각 순서
    assert_eq!(codes(&rows), vec!["005930", "000660"]);
    store.close().await;

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_open_missing_file() {
    let missing = temp_dir().join("nothing.db");
    let err = SessionStore::open(&missing).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}
