//! Election configuration
//!
//! Loaded from the `[management]` table of a TOML file:
//!
//! ```toml
//! [management]
//! heartbeat_interval_secs = 1
//! master_check_interval_secs = 1
//! heartbeat_expiration_secs = 10
//! management_id = "jobs-service-master"
//! ```

use crate::error::ConfigError;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default singleton record id
pub const DEFAULT_MANAGEMENT_ID: &str = "jobs-service-master";

/// Election timing and identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectionConfig {
    /// Seconds between heartbeat refreshes while master
    pub heartbeat_interval_secs: u64,
    /// Seconds between probes while candidate
    pub master_check_interval_secs: u64,
    /// Seconds after which an unrefreshed heartbeat is considered dead
    pub heartbeat_expiration_secs: u64,
    /// Singleton record id shared by all instances of a deployment
    pub management_id: String,
}

#[derive(Debug, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    management: ElectionConfig,
}

impl ElectionConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With heartbeat interval
    #[inline]
    #[must_use]
    pub fn with_heartbeat_interval_secs(mut self, secs: u64) -> Self {
        self.heartbeat_interval_secs = secs;
        self
    }

    /// With probe interval
    #[inline]
    #[must_use]
    pub fn with_master_check_interval_secs(mut self, secs: u64) -> Self {
        self.master_check_interval_secs = secs;
        self
    }

    /// With heartbeat expiration window
    #[inline]
    #[must_use]
    pub fn with_heartbeat_expiration_secs(mut self, secs: u64) -> Self {
        self.heartbeat_expiration_secs = secs;
        self
    }

    /// With singleton record id
    #[inline]
    #[must_use]
    pub fn with_management_id(mut self, id: impl Into<String>) -> Self {
        self.management_id = id.into();
        self
    }

    /// Heartbeat timer period
    #[inline]
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Probe timer period
    #[inline]
    #[must_use]
    pub fn master_check_interval(&self) -> Duration {
        Duration::from_secs(self.master_check_interval_secs)
    }

    /// Lease expiration window for timestamp arithmetic
    #[must_use]
    pub fn heartbeat_expiration(&self) -> TimeDelta {
        i64::try_from(self.heartbeat_expiration_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    /// Check that the configuration can drive an election
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "heartbeat_interval_secs",
                "must be at least 1",
            ));
        }
        if self.master_check_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "master_check_interval_secs",
                "must be at least 1",
            ));
        }
        if self.heartbeat_expiration_secs <= self.heartbeat_interval_secs {
            return Err(ConfigError::invalid(
                "heartbeat_expiration_secs",
                format!(
                    "must be longer than the heartbeat interval ({}s)",
                    self.heartbeat_interval_secs
                ),
            ));
        }
        if self.management_id.trim().is_empty() {
            return Err(ConfigError::invalid("management_id", "must not be empty"));
        }
        Ok(())
    }

    /// Parse and validate the `[management]` table of a TOML document
    ///
    /// A missing table yields the defaults.
    ///
    /// # Errors
    /// Parse or validation failures.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let document: ConfigDocument = toml::from_str(input)?;
        document.management.validate()?;
        Ok(document.management)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// I/O, parse or validation failures.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 1,
            master_check_interval_secs: 1,
            heartbeat_expiration_secs: 10,
            management_id: DEFAULT_MANAGEMENT_ID.to_string(),
        }
    }
}
