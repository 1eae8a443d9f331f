//! error types for chainfund-types

use thiserror::Error;

/// errors that can occur in chainfund-types
#[derive(Debug, Error)]
pub enum Error {
    /// unknown approval status string
    #[error("unknown approval status: {0}")]
    UnknownStatus(String),

    /// unknown approval event action string
    #[error("unknown approval action: {0}")]
    UnknownAction(String),

    /// unknown user role string
    #[error("unknown user role: {0}")]
    UnknownRole(String),

    /// milestone index outside the campaign's milestone list
    #[error("milestone {index} does not exist (campaign has {count})")]
    MilestoneOutOfRange {
        /// requested zero-based index
        index: u32,
        /// number of milestones on the campaign
        count: usize,
    },

    /// a sum of amounts does not fit the amount range
    #[error("amount overflow")]
    AmountOverflow,

    /// configuration error
    #[error("configuration error: {0}")]
    Config(String),
}
