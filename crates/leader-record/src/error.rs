//! Error types for record stores

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures surfaced by a [`RecordStore`](crate::RecordStore)
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend cannot be reached right now
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Database driver failure
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Check if the failure is transient and worth retrying on the next tick
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            #[cfg(feature = "postgres")]
            Self::Database(err) => matches!(
                err,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
        }
    }
}
