//! milestone approval engine for chainfund.
//!
//! decides when a campaign milestone's funds may be released. a milestone is
//! released either automatically, once the campaign has raised the cumulative
//! target of that milestone and every milestone before it, or by an admin
//! deciding on a creator's pending request.

#![warn(missing_docs)]

pub mod chain;
pub mod engine;
pub mod error;

pub use chain::{ChainError, ChainRequest, ChainVerifier, ChainVerifierBoxed};
pub use engine::{
    ApprovalEngine, ApprovalStats, AutoVerifyOutcome, MilestoneRequest, PendingApprovals,
};
pub use error::{Error, Result};
