//! Leader Record - persisted lease bookkeeping
//!
//! Provides the shared state that singleton election is built on:
//! - The management record (singleton id, holder token, last heartbeat)
//! - The [`RecordStore`] contract with atomic get-and-update
//! - An in-memory store for single-instance deployments and tests
//! - A PostgreSQL store using row-level locks (feature `postgres`)
//!
//! # Example
//!
//! ```rust,ignore
//! use leader_record::{InMemoryRecordStore, ManagementRecord, RecordStore};
//!
//! # async fn example() -> leader_record::StoreResult<()> {
//! let store = InMemoryRecordStore::new();
//! let claimed = store
//!     .get_and_update(
//!         "jobs-service-master",
//!         Box::new(|current| match current {
//!             None => Some(ManagementRecord::new("jobs-service-master", "t1", None)),
//!             Some(_) => None,
//!         }),
//!     )
//!     .await?;
//! assert!(claimed.is_some());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod clock;
pub mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod record;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryRecordStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresRecordStore;
pub use record::ManagementRecord;
pub use store::{RecordStore, UpdateFn};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
