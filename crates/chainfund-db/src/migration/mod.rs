//! database migrations for chainfund.

pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_users;
mod m20260301_000002_create_campaigns;
mod m20260301_000003_create_donations;
mod m20260302_000004_create_milestone_approvals;
mod m20260302_000005_create_approval_events;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_users::Migration),
            Box::new(m20260301_000002_create_campaigns::Migration),
            Box::new(m20260301_000003_create_donations::Migration),
            Box::new(m20260302_000004_create_milestone_approvals::Migration),
            Box::new(m20260302_000005_create_approval_events::Migration),
        ]
    }
}
