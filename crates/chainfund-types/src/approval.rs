//! milestone approval records and their audit trail.
//!
//! an approval record tracks one attempt to release a campaign milestone's
//! funds. its lifecycle:
//!
//! ```text
//! submit_request ──► pending ──approve──► approved
//!                       │    └─reject───► rejected
//!                       └──auto-verify──► auto_verified ◄─┐
//! auto-verify (no open record) ─────────► auto_verified ──┘ refresh
//! ```
//!
//! `approved` and `rejected` are terminal. `pending` and `auto_verified`
//! are "open": at most one open record exists per (campaign, milestone).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, CampaignId, Error, WalletAddress};

/// unique identifier for an approval record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalId(pub u64);

impl From<u64> for ApprovalId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// approval record status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// awaiting an admin decision
    Pending,
    /// released by an admin
    Approved,
    /// refused by an admin
    Rejected,
    /// released automatically because the cumulative target was reached
    AutoVerified,
}

impl ApprovalStatus {
    /// every status, in display order.
    pub const ALL: [ApprovalStatus; 4] = [
        ApprovalStatus::Pending,
        ApprovalStatus::Approved,
        ApprovalStatus::Rejected,
        ApprovalStatus::AutoVerified,
    ];

    /// the stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
            ApprovalStatus::AutoVerified => "auto_verified",
        }
    }

    /// whether the record still counts towards the one-open-record-per-milestone rule.
    pub fn is_open(&self) -> bool {
        matches!(self, ApprovalStatus::Pending | ApprovalStatus::AutoVerified)
    }

    /// whether the record can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApprovalStatus::Approved | ApprovalStatus::Rejected)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            "auto_verified" => Ok(ApprovalStatus::AutoVerified),
            other => Err(Error::UnknownStatus(other.to_string())),
        }
    }
}

/// an admin decision on a pending record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// release the milestone
    Approve,
    /// refuse the milestone; requires a reason
    Reject,
}

impl Decision {
    /// the status a successful decision moves the record to.
    pub fn target_status(&self) -> ApprovalStatus {
        match self {
            Decision::Approve => ApprovalStatus::Approved,
            Decision::Reject => ApprovalStatus::Rejected,
        }
    }
}

/// a milestone approval record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneApproval {
    /// unique identifier (0 before the record is persisted)
    pub id: ApprovalId,
    /// campaign the milestone belongs to
    pub campaign_id: CampaignId,
    /// zero-based index into the campaign's milestones
    pub milestone_index: u32,
    /// campaign creator at the time the record was created
    pub creator_wallet: WalletAddress,
    /// cumulative amount being claimed
    pub requested_amount: Amount,
    /// supporting evidence urls, fixed at creation
    pub documents: Vec<String>,
    /// current lifecycle state
    pub status: ApprovalStatus,
    /// free-form notes from the last decision or auto-verification
    pub admin_notes: Option<String>,
    /// admin wallet that approved
    pub approved_by: Option<WalletAddress>,
    /// when the record was approved
    pub approved_at: Option<DateTime<Utc>>,
    /// admin wallet that rejected
    pub rejected_by: Option<WalletAddress>,
    /// when the record was rejected
    pub rejected_at: Option<DateTime<Utc>>,
    /// reason given for rejection
    pub rejection_reason: Option<String>,
    /// last time the funding threshold was confirmed
    pub auto_verified_at: Option<DateTime<Utc>>,
    /// hash returned by the chain relay after approval
    pub blockchain_transaction_hash: Option<String>,
    /// when the record was created
    pub created_at: DateTime<Utc>,
    /// when the record was last updated
    pub updated_at: DateTime<Utc>,
}

impl MilestoneApproval {
    /// create a blank record for a milestone in the given initial state.
    pub fn new(
        campaign_id: CampaignId,
        milestone_index: u32,
        creator_wallet: WalletAddress,
        requested_amount: Amount,
        status: ApprovalStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ApprovalId(0),
            campaign_id,
            milestone_index,
            creator_wallet,
            requested_amount,
            documents: Vec::new(),
            status,
            admin_notes: None,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            auto_verified_at: None,
            blockchain_transaction_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// when the record reached its terminal state, if it has.
    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            ApprovalStatus::Approved => self.approved_at,
            ApprovalStatus::Rejected => self.rejected_at,
            ApprovalStatus::Pending | ApprovalStatus::AutoVerified => None,
        }
    }
}

/// kind of entry in an approval's audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    /// creator submitted a request
    Requested,
    /// record created in auto_verified state
    AutoVerified,
    /// open record re-confirmed by auto-verification
    Refreshed,
    /// admin approved
    Approved,
    /// admin rejected
    Rejected,
    /// chain relay returned a transaction hash
    ChainVerified,
    /// chain relay request failed
    ChainFailed,
}

impl ApprovalAction {
    /// the stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalAction::Requested => "requested",
            ApprovalAction::AutoVerified => "auto_verified",
            ApprovalAction::Refreshed => "refreshed",
            ApprovalAction::Approved => "approved",
            ApprovalAction::Rejected => "rejected",
            ApprovalAction::ChainVerified => "chain_verified",
            ApprovalAction::ChainFailed => "chain_failed",
        }
    }
}

impl fmt::Display for ApprovalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ApprovalAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(ApprovalAction::Requested),
            "auto_verified" => Ok(ApprovalAction::AutoVerified),
            "refreshed" => Ok(ApprovalAction::Refreshed),
            "approved" => Ok(ApprovalAction::Approved),
            "rejected" => Ok(ApprovalAction::Rejected),
            "chain_verified" => Ok(ApprovalAction::ChainVerified),
            "chain_failed" => Ok(ApprovalAction::ChainFailed),
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }
}

/// actor recorded for system-driven events.
pub const SYSTEM_ACTOR: &str = "system";

/// one entry in an approval record's append-only audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalEvent {
    /// unique identifier (0 before the record is persisted)
    pub id: u64,
    /// the approval record this event belongs to
    pub approval_id: ApprovalId,
    /// what happened
    pub action: ApprovalAction,
    /// wallet address of the actor, or "system"
    pub actor: String,
    /// human-readable details
    pub details: String,
    /// when the event was recorded
    pub created_at: DateTime<Utc>,
}

impl ApprovalEvent {
    /// create a new unsaved event stamped with the current time.
    pub fn new(
        approval_id: ApprovalId,
        action: ApprovalAction,
        actor: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            approval_id,
            action,
            actor: actor.into(),
            details: details.into(),
            created_at: Utc::now(),
        }
    }

    /// create a new event attributed to the system.
    pub fn system(
        approval_id: ApprovalId,
        action: ApprovalAction,
        details: impl Into<String>,
    ) -> Self {
        Self::new(approval_id, action, SYSTEM_ACTOR, details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::eth;

    #[test]
    fn test_status_strings() {
        for status in ApprovalStatus::ALL {
            assert_eq!(status.as_str().parse::<ApprovalStatus>().unwrap(), status);
        }
        assert!("done".parse::<ApprovalStatus>().is_err());
    }

    #[test]
    fn test_open_and_terminal_partition() {
        for status in ApprovalStatus::ALL {
            assert_ne!(status.is_open(), status.is_terminal());
        }
        assert!(ApprovalStatus::AutoVerified.is_open());
        assert!(ApprovalStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ApprovalStatus::AutoVerified).unwrap(),
            "\"auto_verified\""
        );
    }

    #[test]
    fn test_decided_at_uses_matching_field() {
        let wallet = WalletAddress::new("0x00000000000000000000000000000000000000aa").unwrap();
        let mut record =
            MilestoneApproval::new(CampaignId(1), 0, wallet, eth("3"), ApprovalStatus::Pending);
        assert!(record.decided_at().is_none());

        let t = Utc::now();
        record.status = ApprovalStatus::Rejected;
        record.rejected_at = Some(t);
        assert_eq!(record.decided_at(), Some(t));

        record.status = ApprovalStatus::Approved;
        assert!(record.decided_at().is_none());
    }

    #[test]
    fn test_action_strings() {
        for action in [
            ApprovalAction::Requested,
            ApprovalAction::AutoVerified,
            ApprovalAction::Refreshed,
            ApprovalAction::Approved,
            ApprovalAction::Rejected,
            ApprovalAction::ChainVerified,
            ApprovalAction::ChainFailed,
        ] {
            assert_eq!(action.as_str().parse::<ApprovalAction>().unwrap(), action);
        }
    }
}
