//! create campaigns table migration

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Campaigns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Campaigns::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Campaigns::CreatorWallet).string().not_null())
                    .col(ColumnDef::new(Campaigns::Title).string().not_null())
                    .col(
                        ColumnDef::new(Campaigns::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Campaigns::GoalAmount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Campaigns::CurrentAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Campaigns::ImageUrl).string())
                    .col(ColumnDef::new(Campaigns::Deadline).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Campaigns::Milestones)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(Campaigns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // index on creator for "my campaigns" listings
        manager
            .create_index(
                Index::create()
                    .name("idx_campaigns_creator_wallet")
                    .table(Campaigns::Table)
                    .col(Campaigns::CreatorWallet)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Campaigns::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Campaigns {
    Table,
    Id,
    CreatorWallet,
    Title,
    Description,
    GoalAmount,
    CurrentAmount,
    ImageUrl,
    Deadline,
    Milestones,
    CreatedAt,
    UpdatedAt,
}
