//! campaigns, milestones and donations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, Error, WalletAddress};

/// unique identifier for a campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CampaignId(pub u64);

impl From<u64> for CampaignId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// a funding checkpoint within a campaign.
///
/// `target_amount` is this milestone's own share. the amount a campaign must
/// have raised before the milestone can be released is cumulative, see
/// [`Campaign::cumulative_target`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    /// short name of the checkpoint
    pub title: String,
    /// what the funds will be used for
    #[serde(default)]
    pub description: String,
    /// this milestone's own (non-cumulative) target
    pub target_amount: Amount,
}

/// a fundraising campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    /// unique identifier (0 before the record is persisted)
    pub id: CampaignId,
    /// wallet that receives released funds
    pub creator_wallet: WalletAddress,
    /// campaign title
    pub title: String,
    /// long-form description
    pub description: String,
    /// overall fundraising goal
    pub goal_amount: Amount,
    /// cumulative funds received so far
    pub current_amount: Amount,
    /// cover image hosted by the media store
    pub image_url: Option<String>,
    /// optional end of the fundraising window
    pub deadline: Option<DateTime<Utc>>,
    /// ordered milestone list, fixed at creation
    pub milestones: Vec<Milestone>,
    /// when the campaign was created
    pub created_at: DateTime<Utc>,
    /// when the campaign was last updated
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// create a new unfunded campaign
    pub fn new(
        creator_wallet: WalletAddress,
        title: String,
        description: String,
        goal_amount: Amount,
        milestones: Vec<Milestone>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: CampaignId(0),
            creator_wallet,
            title,
            description,
            goal_amount,
            current_amount: Amount::ZERO,
            image_url: None,
            deadline: None,
            milestones,
            created_at: now,
            updated_at: now,
        }
    }

    /// look up a milestone by zero-based index.
    pub fn milestone(&self, index: u32) -> Result<&Milestone, Error> {
        self.milestones
            .get(index as usize)
            .ok_or(Error::MilestoneOutOfRange {
                index,
                count: self.milestones.len(),
            })
    }

    /// funds required before milestone `index` can be released.
    ///
    /// this is the sum of the targets of the milestone and all milestones
    /// before it.
    pub fn cumulative_target(&self, index: u32) -> Result<Amount, Error> {
        self.milestone(index)?;
        Amount::checked_sum(
            self.milestones[..=index as usize]
                .iter()
                .map(|m| m.target_amount),
        )
        .ok_or(Error::AmountOverflow)
    }
}

/// a donation reported after the wallet submitted the transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    /// unique identifier (0 before the record is persisted)
    pub id: u64,
    /// campaign receiving the funds
    pub campaign_id: CampaignId,
    /// wallet the funds came from
    pub donor_wallet: WalletAddress,
    /// amount donated
    pub amount: Amount,
    /// on-chain transaction hash, if the client reported one
    pub transaction_hash: Option<String>,
    /// when the donation was recorded
    pub created_at: DateTime<Utc>,
}
