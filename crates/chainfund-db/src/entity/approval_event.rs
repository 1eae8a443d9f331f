//! approval audit event entity for database storage

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use chainfund_types::{ApprovalEvent, ApprovalId};

/// approval event database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "approval_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub approval_id: i64,
    pub action: String,
    pub actor: String,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::milestone_approval::Entity",
        from = "Column::ApprovalId",
        to = "super::milestone_approval::Column::Id"
    )]
    MilestoneApproval,
}

impl Related<super::milestone_approval::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MilestoneApproval.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for ApprovalEvent {
    type Error = crate::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(ApprovalEvent {
            id: model.id as u64,
            approval_id: ApprovalId(model.approval_id as u64),
            action: model.action.parse()?,
            actor: model.actor,
            details: model.details,
            created_at: model.created_at,
        })
    }
}

impl From<&ApprovalEvent> for ActiveModel {
    fn from(event: &ApprovalEvent) -> Self {
        ActiveModel {
            id: if event.id == 0 {
                NotSet
            } else {
                Set(event.id as i64)
            },
            approval_id: Set(event.approval_id.0 as i64),
            action: Set(event.action.as_str().to_string()),
            actor: Set(event.actor.clone()),
            details: Set(event.details.clone()),
            created_at: Set(event.created_at),
        }
    }
}
