//! user entity for database storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use chainfund_types::{Email, User, UserId, WalletAddress};

/// user database model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(unique)]
    pub wallet_address: String,
    pub role: String,
    pub is_verified: bool,
    pub otp_hash: Option<String>,
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub otp_attempts: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for User {
    type Error = crate::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId(model.id as u64),
            name: model.name,
            email: Email::new(&model.email)?,
            wallet_address: WalletAddress::new(&model.wallet_address)?,
            role: model.role.parse()?,
            is_verified: model.is_verified,
            otp_hash: model.otp_hash,
            otp_expires_at: model.otp_expires_at,
            otp_attempts: model.otp_attempts.max(0) as u32,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<&User> for ActiveModel {
    fn from(user: &User) -> Self {
        ActiveModel {
            id: if user.id.0 == 0 {
                NotSet
            } else {
                Set(user.id.0 as i64)
            },
            name: Set(user.name.clone()),
            email: Set(user.email.as_str().to_string()),
            wallet_address: Set(user.wallet_address.as_str().to_string()),
            role: Set(user.role.as_str().to_string()),
            is_verified: Set(user.is_verified),
            otp_hash: Set(user.otp_hash.clone()),
            otp_expires_at: Set(user.otp_expires_at),
            otp_attempts: Set(user.otp_attempts as i32),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
        }
    }
}
