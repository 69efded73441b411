//! Error types for backend synchronization

use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Failures surfaced by the sync client, normalized per backend call.
///
/// Only `Auth` is fatal to the session; the other variants are
/// per-operation and recoverable by retry.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Credential missing or rejected (HTTP 401-class)
    #[error("Authentication rejected: {0}")]
    Auth(String),

    /// Backend rejected the payload (HTTP 400-class)
    #[error("Request rejected: {0}")]
    Validation(String),

    /// Transport failure or server fault (HTTP 5xx)
    #[error("Network failure: {0}")]
    Network(String),

    /// Credential persistence failed
    #[error("Credential storage error: {0}")]
    Storage(String),
}

impl SyncError {
    /// Whether this failure should terminate the session
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

/// Failures reported at the reconciler boundary.
///
/// The `Display` output is the single user-facing message for the whole
/// operation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{0}")]
    Sync(#[from] SyncError),

    /// The delete itself succeeded; recompacting the remaining positions
    /// did not. The task is gone locally as well, but ordering may be
    /// stale until the next refresh.
    #[error("Task deleted, but reordering the remaining tasks failed: {0}")]
    CompactionFailed(SyncError),

    /// An optimistic reorder failed and the compensating refetch failed
    /// too, so local order may have diverged from the backend
    #[error("Failed to update task order, and refreshing failed: {refresh}")]
    RevertFailed {
        reorder: SyncError,
        refresh: SyncError,
    },
}

impl ReconcileError {
    /// Whether this failure should terminate the session
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Sync(e) | Self::CompactionFailed(e) => e.is_fatal(),
            Self::RevertFailed { reorder, refresh } => reorder.is_fatal() || refresh.is_fatal(),
        }
    }
}
