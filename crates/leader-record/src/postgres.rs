//! PostgreSQL record store
//!
//! The `SELECT ... FOR UPDATE` row lock inside a transaction is the real
//! mutual-exclusion primitive; token and heartbeat are bookkeeping on top.
//! `get_and_update` inserts an empty row before locking it, so even the first
//! claims on a fresh table are serialised. [`PostgresRecordStore::seed`] does
//! the same insert ahead of time.

use crate::clock::{Clock, SystemClock};
use crate::error::StoreResult;
use crate::record::ManagementRecord;
use crate::store::{RecordStore, UpdateFn};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use std::sync::Arc;

const TABLE_DDL: &str = "CREATE TABLE IF NOT EXISTS job_service_management (\
     id TEXT PRIMARY KEY, \
     token TEXT, \
     last_heartbeat TIMESTAMPTZ)";

const SELECT_FOR_UPDATE: &str =
    "SELECT id, token, last_heartbeat FROM job_service_management WHERE id = $1 FOR UPDATE";

const SELECT: &str =
    "SELECT id, token, last_heartbeat FROM job_service_management WHERE id = $1";

const UPSERT: &str = "INSERT INTO job_service_management (id, token, last_heartbeat) \
     VALUES ($1, $2, $3) \
     ON CONFLICT (id) DO UPDATE SET token = $2, last_heartbeat = $3 \
     RETURNING id, token, last_heartbeat";

const SEED: &str =
    "INSERT INTO job_service_management (id) VALUES ($1) ON CONFLICT (id) DO NOTHING";

type Row = (String, Option<String>, Option<DateTime<Utc>>);

fn from_row((id, token, last_heartbeat): Row) -> ManagementRecord {
    ManagementRecord {
        id,
        token,
        last_heartbeat,
    }
}

/// Record store backed by the `job_service_management` table
#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PostgresRecordStore {
    /// Create a store on an existing pool
    #[inline]
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            clock: Arc::new(SystemClock),
        }
    }

    /// Connect a new pool to `database_url`
    ///
    /// # Errors
    /// Connection failures from the driver.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Stamp heartbeats from `clock` instead of the system clock
    #[inline]
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Create the management table if it does not exist
    ///
    /// # Errors
    /// Driver failures.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(TABLE_DDL).execute(&self.pool).await?;
        Ok(())
    }

    /// Insert an empty row for `id` if none exists.
    ///
    /// Optional; `get_and_update` seeds on demand.
    ///
    /// # Errors
    /// Driver failures.
    pub async fn seed(&self, id: &str) -> StoreResult<()> {
        sqlx::query(SEED).bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn upsert<'e, E>(executor: E, record: &ManagementRecord) -> StoreResult<ManagementRecord>
    where
        E: PgExecutor<'e>,
    {
        let row: Row = sqlx::query_as(UPSERT)
            .bind(&record.id)
            .bind(&record.token)
            .bind(record.last_heartbeat)
            .fetch_one(executor)
            .await?;
        Ok(from_row(row))
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn get(&self, id: &str) -> StoreResult<Option<ManagementRecord>> {
        let row: Option<Row> = sqlx::query_as(SELECT)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(from_row))
    }

    async fn get_and_update(
        &self,
        id: &str,
        update: UpdateFn,
    ) -> StoreResult<Option<ManagementRecord>> {
        let mut tx = self.pool.begin().await?;
        // First-time claimants need a row to contend on
        sqlx::query(SEED).bind(id).execute(&mut *tx).await?;
        let row: Option<Row> = sqlx::query_as(SELECT_FOR_UPDATE)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let current = row.map(from_row);
        tracing::debug!("got {}: {:?}", id, current);

        let updated = match update(current) {
            Some(mut record) => {
                record.id = id.to_string();
                Some(Self::upsert(&mut *tx, &record).await?)
            }
            None => None,
        };
        tx.commit().await?;
        Ok(updated)
    }

    async fn set(&self, record: ManagementRecord) -> StoreResult<ManagementRecord> {
        tracing::debug!("set {}", record);
        Self::upsert(&self.pool, &record).await
    }

    async fn heartbeat(&self, record: ManagementRecord) -> StoreResult<ManagementRecord> {
        let record = record.with_heartbeat(self.clock.now());
        self.set(record).await
    }
}
