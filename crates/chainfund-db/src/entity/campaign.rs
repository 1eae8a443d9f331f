//! campaign entity for database storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use chainfund_types::{Amount, Campaign, CampaignId, Milestone, WalletAddress};

/// campaign database model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "campaigns")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub creator_wallet: String,
    pub title: String,
    pub description: String,
    /// amounts are stored in gwei.
    pub goal_amount: i64,
    pub current_amount: i64,
    pub image_url: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    /// milestones stored as a json array of `{title, description, targetAmount}`.
    pub milestones: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::donation::Entity")]
    Donations,
    #[sea_orm(has_many = "super::milestone_approval::Entity")]
    MilestoneApprovals,
}

impl Related<super::donation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Donations.def()
    }
}

impl Related<super::milestone_approval::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MilestoneApprovals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Campaign {
    type Error = crate::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let milestones: Vec<Milestone> = serde_json::from_str(&model.milestones)?;
        Ok(Campaign {
            id: CampaignId(model.id as u64),
            creator_wallet: WalletAddress::new(&model.creator_wallet)?,
            title: model.title,
            description: model.description,
            goal_amount: Amount::from_base_units(model.goal_amount),
            current_amount: Amount::from_base_units(model.current_amount),
            image_url: model.image_url,
            deadline: model.deadline,
            milestones,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl TryFrom<&Campaign> for ActiveModel {
    type Error = crate::Error;

    fn try_from(campaign: &Campaign) -> Result<Self, Self::Error> {
        Ok(ActiveModel {
            id: if campaign.id.0 == 0 {
                NotSet
            } else {
                Set(campaign.id.0 as i64)
            },
            creator_wallet: Set(campaign.creator_wallet.as_str().to_string()),
            title: Set(campaign.title.clone()),
            description: Set(campaign.description.clone()),
            goal_amount: Set(campaign.goal_amount.base_units()),
            current_amount: Set(campaign.current_amount.base_units()),
            image_url: Set(campaign.image_url.clone()),
            deadline: Set(campaign.deadline),
            milestones: Set(serde_json::to_string(&campaign.milestones)?),
            created_at: Set(campaign.created_at),
            updated_at: Set(campaign.updated_at),
        })
    }
}
