//! Testing utilities for the jobs-leader workspace
//!
//! Shared clocks, failure-injecting stores, recording gates, and fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use leader_election::{ChannelGate, Coordinator, ElectionConfig};
use leader_record::{
    Clock, InMemoryRecordStore, ManagementRecord, RecordStore, StoreError, StoreResult, UpdateFn,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Clock starting at a fixed, arbitrary epoch
    pub fn at_epoch() -> Arc<Self> {
        Arc::new(Self::new(epoch()))
    }

    pub fn advance_secs(&self, secs: i64) {
        *self.now.lock() += TimeDelta::seconds(secs);
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

pub fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
}

/// Store wrapper that fails on demand and counts calls
#[derive(Debug)]
pub struct FlakyStore {
    inner: Arc<dyn RecordStore>,
    failing: AtomicBool,
    fail_next: AtomicUsize,
    calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn RecordStore>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
            fail_next: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn in_memory() -> Arc<Self> {
        Arc::new(Self::new(Arc::new(InMemoryRecordStore::new())))
    }

    /// Fail every call until cleared
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Fail the next `n` calls, then recover
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Number of calls seen, including failed ones
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scheduled = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scheduled || self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn get(&self, id: &str) -> StoreResult<Option<ManagementRecord>> {
        self.check()?;
        self.inner.get(id).await
    }

    async fn get_and_update(
        &self,
        id: &str,
        update: UpdateFn,
    ) -> StoreResult<Option<ManagementRecord>> {
        self.check()?;
        self.inner.get_and_update(id, update).await
    }

    async fn set(&self, record: ManagementRecord) -> StoreResult<ManagementRecord> {
        self.check()?;
        self.inner.set(record).await
    }

    async fn heartbeat(&self, record: ManagementRecord) -> StoreResult<ManagementRecord> {
        self.check()?;
        self.inner.heartbeat(record).await
    }
}

/// Gate that records every enable/disable call
#[derive(Debug, Default)]
pub struct RecordingGate {
    events: Mutex<Vec<bool>>,
}

impl RecordingGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `true` for enable, `false` for disable, in call order
    pub fn events(&self) -> Vec<bool> {
        self.events.lock().clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.events.lock().last().copied().unwrap_or(false)
    }
}

impl ChannelGate for RecordingGate {
    fn enable(&self) {
        self.events.lock().push(true);
    }

    fn disable(&self) {
        self.events.lock().push(false);
    }
}

/// Default timings: 1s heartbeat, 1s probe, 10s expiration
pub fn test_config() -> ElectionConfig {
    ElectionConfig::default().with_management_id("test-master")
}

/// Coordinator with a fixed token on a shared store and clock
pub fn coordinator(
    token: &str,
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
) -> (Arc<Coordinator>, Arc<RecordingGate>) {
    let gate = RecordingGate::new();
    let coordinator = Coordinator::new(test_config(), store, gate.clone())
        .with_clock(clock)
        .with_token(token);
    (Arc::new(coordinator), gate)
}
