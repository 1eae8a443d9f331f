//! core types for chainfund - a milestone-gated crowdfunding backend.
//!
//! this crate provides the fundamental data structures used throughout chainfund:
//! - [`User`]: platform accounts, identified by wallet address
//! - [`Campaign`]: fundraising campaigns and their ordered milestones
//! - [`MilestoneApproval`]: the approval record for releasing a milestone's funds
//! - [`Config`]: application configuration

#![warn(missing_docs)]

mod amount;
mod approval;
mod campaign;
mod config;
mod email;
mod error;
mod otp;
mod user;
mod wallet;

pub mod test_utils;

pub use amount::{AMOUNT_DECIMALS, Amount, AmountError};
pub use approval::{
    ApprovalAction, ApprovalEvent, ApprovalId, ApprovalStatus, Decision, MilestoneApproval,
    SYSTEM_ACTOR,
};
pub use campaign::{Campaign, CampaignId, Donation, Milestone};
pub use config::{
    ChainConfig, Config, DEFAULT_RELAY_TIMEOUT_SECS, DatabaseConfig, MailerConfig, OtpConfig,
    SqliteConfig,
};
pub use email::{Email, EmailError};
pub use error::Error;
pub use otp::{OTP_LEN, OtpCode};
pub use user::{User, UserId, UserRole};
pub use wallet::{WalletAddress, WalletAddressError};

/// result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;
