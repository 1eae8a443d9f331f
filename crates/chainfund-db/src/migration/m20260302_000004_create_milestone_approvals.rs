//! create milestone_approvals table migration
//!
//! besides the table, this adds a partial unique index so that at most one
//! open (`pending` or `auto_verified`) record can exist per milestone.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;

use super::m20260301_000002_create_campaigns::Campaigns;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// partial indexes are not expressible through the schema builder; this
/// statement is valid on both sqlite and postgres.
const OPEN_RECORD_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS idx_milestone_approvals_open \
     ON milestone_approvals (campaign_id, milestone_index) \
     WHERE status IN ('pending', 'auto_verified')";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MilestoneApprovals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MilestoneApprovals::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MilestoneApprovals::CampaignId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MilestoneApprovals::MilestoneIndex)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MilestoneApprovals::CreatorWallet)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MilestoneApprovals::RequestedAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MilestoneApprovals::Documents)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(MilestoneApprovals::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(MilestoneApprovals::AdminNotes).text())
                    .col(ColumnDef::new(MilestoneApprovals::ApprovedBy).string())
                    .col(ColumnDef::new(MilestoneApprovals::ApprovedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(MilestoneApprovals::RejectedBy).string())
                    .col(ColumnDef::new(MilestoneApprovals::RejectedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(MilestoneApprovals::RejectionReason).text())
                    .col(
                        ColumnDef::new(MilestoneApprovals::AutoVerifiedAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(ColumnDef::new(MilestoneApprovals::BlockchainTransactionHash).string())
                    .col(
                        ColumnDef::new(MilestoneApprovals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MilestoneApprovals::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_milestone_approvals_campaign")
                            .from(MilestoneApprovals::Table, MilestoneApprovals::CampaignId)
                            .to(Campaigns::Table, Campaigns::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // lookup by (campaign, milestone) for status queries
        manager
            .create_index(
                Index::create()
                    .name("idx_milestone_approvals_campaign_milestone")
                    .table(MilestoneApprovals::Table)
                    .col(MilestoneApprovals::CampaignId)
                    .col(MilestoneApprovals::MilestoneIndex)
                    .to_owned(),
            )
            .await?;

        // index on status for the admin queue and stats
        manager
            .create_index(
                Index::create()
                    .name("idx_milestone_approvals_status")
                    .table(MilestoneApprovals::Table)
                    .col(MilestoneApprovals::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(OPEN_RECORD_INDEX)
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MilestoneApprovals::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum MilestoneApprovals {
    Table,
    Id,
    CampaignId,
    MilestoneIndex,
    CreatorWallet,
    RequestedAmount,
    Documents,
    Status,
    AdminNotes,
    ApprovedBy,
    ApprovedAt,
    RejectedBy,
    RejectedAt,
    RejectionReason,
    AutoVerifiedAt,
    BlockchainTransactionHash,
    CreatedAt,
    UpdatedAt,
}
