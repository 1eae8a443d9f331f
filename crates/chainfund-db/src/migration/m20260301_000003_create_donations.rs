//! create donations table migration

use sea_orm_migration::prelude::*;

use super::m20260301_000002_create_campaigns::Campaigns;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Donations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Donations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Donations::CampaignId).big_integer().not_null())
                    .col(ColumnDef::new(Donations::DonorWallet).string().not_null())
                    .col(ColumnDef::new(Donations::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Donations::TransactionHash).string())
                    .col(
                        ColumnDef::new(Donations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_donations_campaign")
                            .from(Donations::Table, Donations::CampaignId)
                            .to(Campaigns::Table, Campaigns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_donations_campaign_id")
                    .table(Donations::Table)
                    .col(Donations::CampaignId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Donations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Donations {
    Table,
    Id,
    CampaignId,
    DonorWallet,
    Amount,
    TransactionHash,
    CreatedAt,
}
