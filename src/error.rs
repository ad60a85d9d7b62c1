//! Error types for scrub runs.

use std::fmt;

use thiserror::Error;

/// An error reported by the database collaborator.
///
/// The message is the driver's own text, surfaced unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Why a run was refused before any statement was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardRejection {
    /// The target is marked live and no override was given.
    ProtectedTarget,
    /// The operator did not confirm the run.
    NotConfirmed,
}

impl fmt::Display for GuardRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardRejection::ProtectedTarget => write!(
                f,
                "database is marked as live; re-run with --live if you really wish to continue"
            ),
            GuardRejection::NotConfirmed => write!(f, "scrub was not confirmed"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ScrubError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("run refused: {0}")]
    Guard(GuardRejection),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ScrubError {
    /// Process exit status for this error.
    ///
    /// Guard rejections are kept distinct from mid-run failures.
    pub fn exit_code(&self) -> u8 {
        match self {
            ScrubError::Store(_) => 1,
            ScrubError::Config(_) => 2,
            ScrubError::Guard(_) => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrubError>;
