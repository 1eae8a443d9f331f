//! error types for chainfund-approvals.

use thiserror::Error;

/// errors that can occur in approval operations.
#[derive(Debug, Error)]
pub enum Error {
    /// the caller's input is unusable.
    #[error("{0}")]
    Validation(String),

    /// the caller may not perform this operation.
    #[error("{0}")]
    Authorization(String),

    /// a campaign, milestone or approval record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// the record is not in a state that allows the operation.
    #[error("{0}")]
    Conflict(String),

    /// the record store failed.
    #[error("store error: {0}")]
    Dependency(String),
}

impl From<chainfund_db::Error> for Error {
    fn from(err: chainfund_db::Error) -> Self {
        match err {
            chainfund_db::Error::NotFound(msg) => Error::NotFound(msg),
            chainfund_db::Error::AlreadyExists(msg) => Error::Conflict(msg),
            other => Error::Dependency(other.to_string()),
        }
    }
}

/// result type for approval operations.
pub type Result<T> = std::result::Result<T, Error>;
