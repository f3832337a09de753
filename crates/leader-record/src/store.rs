//! Record store contract
//!
//! The store is the only cross-process shared resource in the election
//! protocol. Its `get_and_update` must serialise concurrent callers on the
//! same id; the lease claim is only atomic because of that lock.

use crate::error::StoreResult;
use crate::record::ManagementRecord;
use async_trait::async_trait;
use std::fmt::Debug;

/// Update computed under the record lock.
///
/// Receives the current record (or `None` when no row exists) and returns the
/// record to persist, or `None` to leave the store untouched.
pub type UpdateFn =
    Box<dyn FnOnce(Option<ManagementRecord>) -> Option<ManagementRecord> + Send>;

/// Persistence contract for the management record
#[async_trait]
pub trait RecordStore: Send + Sync + Debug {
    /// Read the record for `id`
    async fn get(&self, id: &str) -> StoreResult<Option<ManagementRecord>>;

    /// Read the record for `id` under an exclusive lock, apply `update`, and
    /// persist its result.
    ///
    /// # Returns
    /// The persisted record, or `None` when `update` chose not to change it.
    ///
    /// # Errors
    /// Any backend failure. Nothing is written when an error is returned.
    async fn get_and_update(
        &self,
        id: &str,
        update: UpdateFn,
    ) -> StoreResult<Option<ManagementRecord>>;

    /// Unconditional upsert
    async fn set(&self, record: ManagementRecord) -> StoreResult<ManagementRecord>;

    /// Stamp the current time on `record` and upsert it
    async fn heartbeat(&self, record: ManagementRecord) -> StoreResult<ManagementRecord>;
}
