//! Error types for collaborator seams and the reschedule path.

use thiserror::Error;

/// Failure reported by an external collaborator (calendar, task store, audit sink).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The integration is not configured for this user (no calendar connected, no store).
    #[error("integration not connected")]
    NotConnected,

    /// Network/API failure while talking to the collaborator.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The collaborator returned data that could not be interpreted.
    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl SourceError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// Why a reschedule did not go through.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RescheduleError {
    #[error("task store is not configured")]
    StoreUnavailable,

    #[error("task {0} not found")]
    TaskNotFound(String),

    #[error("task store error: {0}")]
    Store(#[from] SourceError),
}
