//! PostgreSQL store tests
//!
//! Need a live database: `DATABASE_URL=postgres://... cargo test -p leader-record
//! --features postgres -- --ignored`. Each test works on its own record id.

#![cfg(feature = "postgres")]

use chrono::{DateTime, TimeZone, Utc};
use leader_record::{Clock, ManagementRecord, PostgresRecordStore, RecordStore, UpdateFn};
use std::sync::Arc;

#[derive(Debug)]
struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn unique_id(prefix: &str) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{prefix}-{}-{nanos}", std::process::id())
}

async fn connect() -> Option<PostgresRecordStore> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };
    let store = PostgresRecordStore::connect(&url).await.unwrap();
    store.ensure_schema().await.unwrap();
    Some(store)
}

fn claim_if_free(id: String, token: String) -> UpdateFn {
    Box::new(move |current: Option<ManagementRecord>| match current {
        Some(record) if !record.is_released() => None,
        _ => Some(ManagementRecord::new(id, token, Some(at(0)))),
    })
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn set_get_heartbeat_round_trip() {
    let Some(store) = connect().await else { return };
    let store = store.with_clock(Arc::new(FixedClock(at(42))));
    let id = unique_id("round-trip");

    assert!(store.get(&id).await.unwrap().is_none());

    let written = store
        .set(ManagementRecord::new(id.clone(), "t1", Some(at(1))))
        .await
        .unwrap();
    assert_eq!(store.get(&id).await.unwrap(), Some(written));

    let beat = store
        .heartbeat(ManagementRecord::new(id.clone(), "t1", None))
        .await
        .unwrap();
    assert_eq!(beat.last_heartbeat, Some(at(42)));
    assert_eq!(store.get(&id).await.unwrap(), Some(beat));
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn nullable_columns_map_to_released_record() {
    let Some(store) = connect().await else { return };
    let id = unique_id("released");

    store.set(ManagementRecord::released(id.clone())).await.unwrap();
    let record = store.get(&id).await.unwrap().unwrap();
    assert!(record.is_released());
    assert_eq!(record.last_heartbeat, None);
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn update_returning_none_writes_nothing_held() {
    let Some(store) = connect().await else { return };
    let id = unique_id("no-change");

    store
        .set(ManagementRecord::new(id.clone(), "t1", Some(at(0))))
        .await
        .unwrap();
    let result = store
        .get_and_update(&id, claim_if_free(id.clone(), "t2".to_string()))
        .await
        .unwrap();

    assert!(result.is_none());
    assert!(store.get(&id).await.unwrap().unwrap().is_held_by("t1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "needs DATABASE_URL"]
async fn concurrent_claims_on_empty_table_elect_one() {
    let Some(store) = connect().await else { return };
    let id = unique_id("race");

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            store
                .get_and_update(&id, claim_if_free(id.clone(), format!("t{i}")))
                .await
                .unwrap()
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        if let Some(record) = handle.await.unwrap() {
            winners.push(record);
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(store.get(&id).await.unwrap(), Some(winners.remove(0)));
}
