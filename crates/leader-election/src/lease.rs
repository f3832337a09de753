//! Lease predicates and the store updates built from them
//!
//! These run inside [`RecordStore::get_and_update`](leader_record::RecordStore),
//! under the record lock, so they must stay pure: no I/O, no role changes.
//! "Now" is read from the clock once the lock is held, so time spent waiting
//! for the lock does not age the written heartbeat.

use chrono::{DateTime, TimeDelta, Utc};
use leader_record::{Clock, ManagementRecord, UpdateFn};
use std::sync::Arc;

/// Whether `token` may take the lease given the `current` record.
///
/// Claimable when there is no record, no holder, no heartbeat, the holder is
/// `token` itself, or the heartbeat is older than `now - expiration`.
#[must_use]
pub fn is_claimable(
    current: Option<&ManagementRecord>,
    token: &str,
    now: DateTime<Utc>,
    expiration: TimeDelta,
) -> bool {
    match current {
        None => true,
        Some(record) => {
            record.is_released() || record.is_held_by(token) || record.is_expired(now, expiration)
        }
    }
}

/// Update that writes `candidate`, stamped with the current time, when the
/// lease is claimable by its token
#[must_use]
pub fn claim(
    candidate: ManagementRecord,
    clock: Arc<dyn Clock>,
    expiration: TimeDelta,
) -> UpdateFn {
    Box::new(move |current| {
        let now = clock.now();
        let token = candidate.token.as_deref().unwrap_or_default();
        let claimable = is_claimable(current.as_ref(), token, now, expiration);
        claimable.then(|| candidate.with_heartbeat(now))
    })
}

/// Update that refreshes the heartbeat only while `token` still holds the lease
#[must_use]
pub fn renew(token: String, clock: Arc<dyn Clock>) -> UpdateFn {
    Box::new(move |current| {
        current
            .filter(|record| record.is_held_by(&token))
            .map(|record| record.with_heartbeat(clock.now()))
    })
}

/// Update that clears the record only while `token` still holds the lease
#[must_use]
pub fn release(token: String) -> UpdateFn {
    Box::new(move |current| {
        current
            .filter(|record| record.is_held_by(&token))
            .map(|record| ManagementRecord::released(record.id))
    })
}
