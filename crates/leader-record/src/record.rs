//! Management record
//!
//! One row per deployment namespace, keyed by a well-known id. The token
//! identifies the process currently holding the lease and the heartbeat
//! tells everyone else how fresh that claim is.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted lease record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementRecord {
    /// Fixed singleton id
    pub id: String,
    /// Token of the current holder, if any
    pub token: Option<String>,
    /// Last heartbeat written by the holder, if any
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl ManagementRecord {
    /// Create a record held by `token`
    #[inline]
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        token: impl Into<String>,
        last_heartbeat: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: id.into(),
            token: Some(token.into()),
            last_heartbeat,
        }
    }

    /// Create a record with no holder and no heartbeat
    #[inline]
    #[must_use]
    pub fn released(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            token: None,
            last_heartbeat: None,
        }
    }

    /// Same record stamped with a new heartbeat
    #[inline]
    #[must_use]
    pub fn with_heartbeat(mut self, at: DateTime<Utc>) -> Self {
        self.last_heartbeat = Some(at);
        self
    }

    /// Whether the lease is held by `token`
    #[inline]
    #[must_use]
    pub fn is_held_by(&self, token: &str) -> bool {
        self.token.as_deref() == Some(token)
    }

    /// Whether nobody holds the record
    #[inline]
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.token.is_none()
    }

    /// Whether the heartbeat is older than `now - expiration`.
    ///
    /// A record without a heartbeat counts as expired. If the cutoff cannot be
    /// represented the lease is treated as still valid.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, expiration: TimeDelta) -> bool {
        match self.last_heartbeat {
            None => true,
            Some(heartbeat) => now
                .checked_sub_signed(expiration)
                .is_some_and(|cutoff| heartbeat < cutoff),
        }
    }
}

impl fmt::Display for ManagementRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ManagementRecord {{ id: {}, token: {}, last_heartbeat: {} }}",
            self.id,
            self.token.as_deref().unwrap_or("-"),
            self.last_heartbeat
                .map_or_else(|| "-".to_string(), |t| t.to_rfc3339())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn released_record_has_no_holder() {
        let record = ManagementRecord::released("master");
        assert!(record.is_released());
        assert!(!record.is_held_by("t1"));
        assert!(record.is_expired(at(0), TimeDelta::seconds(10)));
    }

    #[test]
    fn heartbeat_expiry_is_strict() {
        let record = ManagementRecord::new("master", "t1", Some(at(0)));
        let window = TimeDelta::seconds(10);

        assert!(!record.is_expired(at(5), window));
        assert!(!record.is_expired(at(10), window));
        assert!(record.is_expired(at(11), window));
    }

    #[test]
    fn unrepresentable_cutoff_keeps_lease() {
        let record = ManagementRecord::new("master", "t1", Some(at(0)));
        assert!(!record.is_expired(at(0), TimeDelta::MAX));
    }

    #[test]
    fn with_heartbeat_keeps_token() {
        let record = ManagementRecord::new("master", "t1", None).with_heartbeat(at(3));
        assert!(record.is_held_by("t1"));
        assert_eq!(record.last_heartbeat, Some(at(3)));
    }

    #[test]
    fn record_serializes_nullable_fields() {
        let json = serde_json::to_string(&ManagementRecord::released("master")).unwrap();
        assert_eq!(json, r#"{"id":"master","token":null,"last_heartbeat":null}"#);
    }
}
