//! Error type for progress operations.

use thiserror::Error;

/// Failures surfaced by the unlock engine and authoring operations.
///
/// Empty ledgers, empty courses and a missing successor are valid states and
/// never produce an error.
#[derive(Debug, Error)]
pub enum ProgressError {
    /// A referenced course, level, mission or node does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// No authenticated acting user was supplied.
    #[error("an authenticated user is required")]
    Unauthorized,

    /// Reading or writing the data store failed. Not retried.
    #[error("data store unavailable: {0}")]
    StoreUnavailable(#[source] anyhow::Error),

    /// The stored hierarchy is in a state the authoring operations cannot
    /// produce, e.g. a node placed in another course's mission.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Authored content or structure failed validation.
    #[error("invalid content: {0}")]
    InvalidContent(String),

    /// The request collides with existing data, e.g. a taken node position.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl ProgressError {
    pub fn store(err: impl Into<anyhow::Error>) -> Self {
        Self::StoreUnavailable(err.into())
    }
}

pub type Result<T, E = ProgressError> = std::result::Result<T, E>;
