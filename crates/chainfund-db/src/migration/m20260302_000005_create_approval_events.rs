//! create approval_events table migration

use sea_orm_migration::prelude::*;

use super::m20260302_000004_create_milestone_approvals::MilestoneApprovals;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ApprovalEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApprovalEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ApprovalEvents::ApprovalId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ApprovalEvents::Action).string().not_null())
                    .col(ColumnDef::new(ApprovalEvents::Actor).string().not_null())
                    .col(
                        ColumnDef::new(ApprovalEvents::Details)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(ApprovalEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_approval_events_approval")
                            .from(ApprovalEvents::Table, ApprovalEvents::ApprovalId)
                            .to(MilestoneApprovals::Table, MilestoneApprovals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // index on approval_id for listing a record's history
        manager
            .create_index(
                Index::create()
                    .name("idx_approval_events_approval_id")
                    .table(ApprovalEvents::Table)
                    .col(ApprovalEvents::ApprovalId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApprovalEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ApprovalEvents {
    Table,
    Id,
    ApprovalId,
    Action,
    Actor,
    Details,
    CreatedAt,
}
