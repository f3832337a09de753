//! Error types for leader election
//!
//! Store failures during ticks never reach the lifecycle hooks; they are
//! logged by the coordinator. These types surface from the raw `probe`,
//! `heartbeat` and `release` operations and from configuration loading.

use leader_record::StoreError;
use std::path::PathBuf;

/// Main election error type
#[derive(Debug, thiserror::Error)]
pub enum ElectionError {
    /// Record store failed
    #[error("record store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// `start` called twice
    #[error("coordinator already started")]
    AlreadyStarted,

    /// `stop` called before `start`
    #[error("coordinator not started")]
    NotStarted,
}

impl ElectionError {
    /// Check if the next tick may succeed where this one failed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(err) => err.is_retryable(),
            Self::Config(_) | Self::AlreadyStarted | Self::NotStarted => false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A value is out of range
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Config file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    /// Create an invalid-value error
    #[inline]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Result alias for election operations
pub type ElectionResult<T> = Result<T, ElectionError>;
