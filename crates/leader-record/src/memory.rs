//! In-memory record store
//!
//! Suitable for single-instance deployments, and for tests where several
//! coordinators share one store handle to simulate a shared database.

use crate::clock::{Clock, SystemClock};
use crate::error::StoreResult;
use crate::record::ManagementRecord;
use crate::store::{RecordStore, UpdateFn};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Record store backed by a process-local map
#[derive(Debug, Clone)]
pub struct InMemoryRecordStore {
    records: Arc<Mutex<HashMap<String, ManagementRecord>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRecordStore {
    /// Create an empty store using the system clock
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store stamping heartbeats from `clock`
    #[inline]
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Whether the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, id: &str) -> StoreResult<Option<ManagementRecord>> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn get_and_update(
        &self,
        id: &str,
        update: UpdateFn,
    ) -> StoreResult<Option<ManagementRecord>> {
        // Held across the update so concurrent callers are serialised
        let mut records = self.records.lock().await;
        let current = records.get(id).cloned();
        tracing::debug!("get {}: {:?}", id, current);

        let Some(mut updated) = update(current) else {
            return Ok(None);
        };
        updated.id = id.to_string();
        records.insert(updated.id.clone(), updated.clone());
        Ok(Some(updated))
    }

    async fn set(&self, record: ManagementRecord) -> StoreResult<ManagementRecord> {
        tracing::debug!("set {}", record);
        self.records
            .lock()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn heartbeat(&self, record: ManagementRecord) -> StoreResult<ManagementRecord> {
        let record = record.with_heartbeat(self.clock.now());
        self.set(record).await
    }
}
