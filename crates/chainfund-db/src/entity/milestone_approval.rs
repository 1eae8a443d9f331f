//! milestone approval entity for database storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use chainfund_types::{Amount, ApprovalId, CampaignId, MilestoneApproval, WalletAddress};

/// milestone approval database model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "milestone_approvals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub campaign_id: i64,
    pub milestone_index: i32,
    pub creator_wallet: String,
    /// gwei.
    pub requested_amount: i64,
    /// document urls stored as a json array string.
    pub documents: String,
    pub status: String,
    pub admin_notes: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<String>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub auto_verified_at: Option<DateTime<Utc>>,
    pub blockchain_transaction_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::campaign::Entity",
        from = "Column::CampaignId",
        to = "super::campaign::Column::Id"
    )]
    Campaign,
    #[sea_orm(has_many = "super::approval_event::Entity")]
    Events,
}

impl Related<super::campaign::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Campaign.def()
    }
}

impl Related<super::approval_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Events.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

fn parse_wallet(value: Option<String>) -> Result<Option<WalletAddress>, crate::Error> {
    value
        .map(|w| WalletAddress::new(&w).map_err(Into::into))
        .transpose()
}

impl TryFrom<Model> for MilestoneApproval {
    type Error = crate::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(MilestoneApproval {
            id: ApprovalId(model.id as u64),
            campaign_id: CampaignId(model.campaign_id as u64),
            milestone_index: model.milestone_index as u32,
            creator_wallet: WalletAddress::new(&model.creator_wallet)?,
            requested_amount: Amount::from_base_units(model.requested_amount),
            documents: serde_json::from_str(&model.documents)?,
            status: model.status.parse()?,
            admin_notes: model.admin_notes,
            approved_by: parse_wallet(model.approved_by)?,
            approved_at: model.approved_at,
            rejected_by: parse_wallet(model.rejected_by)?,
            rejected_at: model.rejected_at,
            rejection_reason: model.rejection_reason,
            auto_verified_at: model.auto_verified_at,
            blockchain_transaction_hash: model.blockchain_transaction_hash,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl TryFrom<&MilestoneApproval> for ActiveModel {
    type Error = crate::Error;

    fn try_from(approval: &MilestoneApproval) -> Result<Self, Self::Error> {
        Ok(ActiveModel {
            id: if approval.id.0 == 0 {
                NotSet
            } else {
                Set(approval.id.0 as i64)
            },
            campaign_id: Set(approval.campaign_id.0 as i64),
            milestone_index: Set(approval.milestone_index as i32),
            creator_wallet: Set(approval.creator_wallet.as_str().to_string()),
            requested_amount: Set(approval.requested_amount.base_units()),
            documents: Set(serde_json::to_string(&approval.documents)?),
            status: Set(approval.status.as_str().to_string()),
            admin_notes: Set(approval.admin_notes.clone()),
            approved_by: Set(approval.approved_by.as_ref().map(|w| w.as_str().to_string())),
            approved_at: Set(approval.approved_at),
            rejected_by: Set(approval.rejected_by.as_ref().map(|w| w.as_str().to_string())),
            rejected_at: Set(approval.rejected_at),
            rejection_reason: Set(approval.rejection_reason.clone()),
            auto_verified_at: Set(approval.auto_verified_at),
            blockchain_transaction_hash: Set(approval.blockchain_transaction_hash.clone()),
            created_at: Set(approval.created_at),
            updated_at: Set(approval.updated_at),
        })
    }
}
