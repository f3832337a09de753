//! Wall-clock source for heartbeat timestamps

use chrono::{DateTime, Utc};
use std::fmt::Debug;

/// Source of "now" for lease bookkeeping.
///
/// Heartbeats are compared across processes, so this is wall-clock UTC time,
/// not a monotonic instant.
pub trait Clock: Send + Sync + Debug {
    /// Current time
    fn now(&self) -> DateTime<Utc>;
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
