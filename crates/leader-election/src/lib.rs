//! Leader Election - singleton coordination for scaled-out job schedulers
//!
//! Keeps exactly one active instance per deployment, up to the lease
//! expiration window:
//! - Lease claims via atomic get-and-update on a shared record
//! - Heartbeats that keep the lease alive while master
//! - Two pausable timers swapped on every role change
//! - Channel gating so only the master consumes and produces
//!
//! # Example
//!
//! ```rust,ignore
//! use leader_election::prelude::*;
//! use leader_record::InMemoryRecordStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), ElectionError> {
//! let gate = Arc::new(MessagingGate::new());
//! let jobs = gate.register_consumer("jobs");
//!
//! let coordinator = Arc::new(Coordinator::new(
//!     ElectionConfig::default(),
//!     Arc::new(InMemoryRecordStore::new()),
//!     gate.clone(),
//! ));
//! coordinator.start().await?;
//! assert!(!jobs.is_paused());
//!
//! coordinator.stop().await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod gate;
pub mod lease;
pub mod role;
pub mod timer;

pub use config::{ElectionConfig, DEFAULT_MANAGEMENT_ID};
pub use coordinator::{generate_token, Coordinator};
pub use error::{ConfigError, ElectionError, ElectionResult};
pub use gate::{ChannelGate, ConsumerHandle, GateClosed, MessagingChangeEvent, MessagingGate};
pub use role::{Role, RoleChange};
pub use timer::{PeriodicTimer, TimerState};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for wiring an election
    pub use crate::{
        ChannelGate, Coordinator, ElectionConfig, ElectionError, MessagingChangeEvent,
        MessagingGate, Role,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
