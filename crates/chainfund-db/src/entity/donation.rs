//! donation entity for database storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use chainfund_types::{Amount, CampaignId, Donation, WalletAddress};

/// donation database model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "donations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub campaign_id: i64,
    pub donor_wallet: String,
    /// gwei.
    pub amount: i64,
    pub transaction_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::campaign::Entity",
        from = "Column::CampaignId",
        to = "super::campaign::Column::Id"
    )]
    Campaign,
}

impl Related<super::campaign::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Campaign.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Donation {
    type Error = crate::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Donation {
            id: model.id as u64,
            campaign_id: CampaignId(model.campaign_id as u64),
            donor_wallet: WalletAddress::new(&model.donor_wallet)?,
            amount: Amount::from_base_units(model.amount),
            transaction_hash: model.transaction_hash,
            created_at: model.created_at,
        })
    }
}

impl From<&Donation> for ActiveModel {
    fn from(donation: &Donation) -> Self {
        ActiveModel {
            id: if donation.id == 0 {
                NotSet
            } else {
                Set(donation.id as i64)
            },
            campaign_id: Set(donation.campaign_id.0 as i64),
            donor_wallet: Set(donation.donor_wallet.as_str().to_string()),
            amount: Set(donation.amount.base_units()),
            transaction_hash: Set(donation.transaction_hash.clone()),
            created_at: Set(donation.created_at),
        }
    }
}
