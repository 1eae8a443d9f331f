//! database layer for chainfund.
//!
//! this crate provides persistent storage for:
//! - Users
//! - Campaigns and their donations
//! - Milestone approval records and their audit events
//!
//! state transitions on approval records are conditional updates: the
//! `WHERE` clause carries the expected current status and the caller learns
//! from the affected row count whether it won.

#![warn(missing_docs)]

mod entity;
mod error;
mod migration;

pub use error::Error;

use std::future::Future;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database as SeaOrmDatabase, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait, sea_query::Expr,
};
use sea_orm_migration::MigratorTrait;

use chainfund_types::{
    ApprovalEvent, ApprovalId, ApprovalStatus, Campaign, CampaignId, Config, Decision, Donation,
    MilestoneApproval, User, UserId, WalletAddress,
};

/// result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;

/// the fields written when an admin decides on a pending record.
#[derive(Debug, Clone)]
pub struct DecisionUpdate {
    /// approve or reject.
    pub decision: Decision,
    /// deciding admin.
    pub actor: WalletAddress,
    /// admin notes; for rejections this is also the rejection reason.
    pub notes: Option<String>,
    /// decision time.
    pub at: DateTime<Utc>,
}

/// database trait for chainfund storage operations.
///
/// this trait abstracts over different database backends (sqlite, postgresql).
pub trait Database: Send + Sync {
    // ─── Health Check ─────────────────────────────────────────────────────────

    /// ping the database to verify connectivity.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    // ─── User Operations ─────────────────────────────────────────────────────

    /// create a new user. fails with `AlreadyExists` on duplicate email or wallet.
    fn create_user(&self, user: &User) -> impl Future<Output = Result<User>> + Send;

    /// get a user by wallet address.
    fn get_user_by_wallet(
        &self,
        wallet: &WalletAddress,
    ) -> impl Future<Output = Result<Option<User>>> + Send;

    /// get a user by (lowercased) email.
    fn get_user_by_email(&self, email: &str) -> impl Future<Output = Result<Option<User>>> + Send;

    /// list all users, oldest first.
    fn list_users(&self) -> impl Future<Output = Result<Vec<User>>> + Send;

    /// update an existing user. also updates `updated_at`.
    fn update_user(&self, user: &User) -> impl Future<Output = Result<User>> + Send;

    /// count one guess against a user's outstanding passcode.
    ///
    /// returns false, leaving the counter alone, when no passcode is
    /// outstanding or `max_attempts` guesses were already made.
    fn claim_otp_attempt(
        &self,
        id: UserId,
        max_attempts: u32,
    ) -> impl Future<Output = Result<bool>> + Send;

    // ─── Campaign Operations ─────────────────────────────────────────────────

    /// create a new campaign. returns it with its assigned id.
    fn create_campaign(&self, campaign: &Campaign)
    -> impl Future<Output = Result<Campaign>> + Send;

    /// get a campaign by id.
    fn get_campaign(&self, id: CampaignId)
    -> impl Future<Output = Result<Option<Campaign>>> + Send;

    /// list all campaigns, newest first.
    fn list_campaigns(&self) -> impl Future<Output = Result<Vec<Campaign>>> + Send;

    /// update an existing campaign's editable fields. also updates `updated_at`.
    ///
    /// `current_amount` is left untouched; it only moves through [`Database::record_donation`].
    fn update_campaign(&self, campaign: &Campaign)
    -> impl Future<Output = Result<Campaign>> + Send;

    /// delete a campaign only while it has raised nothing and has no approval records.
    ///
    /// the check and the delete are one statement. returns false if the
    /// campaign exists but is in use, `NotFound` if it does not exist.
    fn delete_unused_campaign(&self, id: CampaignId)
    -> impl Future<Output = Result<bool>> + Send;

    /// store a donation and atomically add its amount to the campaign's total.
    ///
    /// returns the campaign with its new total, or `NotFound`.
    fn record_donation(
        &self,
        donation: &Donation,
    ) -> impl Future<Output = Result<(Donation, Campaign)>> + Send;

    /// list donations to a campaign, newest first.
    fn list_donations(
        &self,
        campaign_id: CampaignId,
    ) -> impl Future<Output = Result<Vec<Donation>>> + Send;

    // ─── Approval Operations ─────────────────────────────────────────────────

    /// create an approval record.
    ///
    /// fails with `AlreadyExists` when an open record already exists for the milestone.
    fn create_approval(
        &self,
        approval: &MilestoneApproval,
    ) -> impl Future<Output = Result<MilestoneApproval>> + Send;

    /// get an approval record by id.
    fn get_approval(
        &self,
        id: ApprovalId,
    ) -> impl Future<Output = Result<Option<MilestoneApproval>>> + Send;

    /// get the open (`pending` or `auto_verified`) record for a milestone.
    fn find_open_approval(
        &self,
        campaign_id: CampaignId,
        milestone_index: u32,
    ) -> impl Future<Output = Result<Option<MilestoneApproval>>> + Send;

    /// get the most recently created record for a milestone, whatever its status.
    fn latest_approval(
        &self,
        campaign_id: CampaignId,
        milestone_index: u32,
    ) -> impl Future<Output = Result<Option<MilestoneApproval>>> + Send;

    /// list records with the given status, newest first.
    fn list_approvals_by_status(
        &self,
        status: ApprovalStatus,
    ) -> impl Future<Output = Result<Vec<MilestoneApproval>>> + Send;

    /// count records with the given status.
    fn count_approvals_by_status(
        &self,
        status: ApprovalStatus,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// count records of any status for a campaign.
    fn count_approvals_for_campaign(
        &self,
        campaign_id: CampaignId,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// move an open record to `auto_verified`, refreshing notes and timestamp.
    ///
    /// returns false if the record is missing or no longer open.
    fn refresh_auto_verified(
        &self,
        id: ApprovalId,
        notes: &str,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// apply a decision to a record only if it is still `pending`.
    ///
    /// returns false if the record is missing or was not pending.
    fn decide_pending(
        &self,
        id: ApprovalId,
        update: &DecisionUpdate,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// store the chain transaction hash unless one is already stored.
    ///
    /// returns false if a hash was already present.
    fn set_transaction_hash(
        &self,
        id: ApprovalId,
        hash: &str,
    ) -> impl Future<Output = Result<bool>> + Send;

    // ─── Audit Operations ────────────────────────────────────────────────────

    /// append an event to an approval's audit trail.
    fn create_approval_event(
        &self,
        event: &ApprovalEvent,
    ) -> impl Future<Output = Result<ApprovalEvent>> + Send;

    /// list an approval's events, oldest first.
    fn list_approval_events(
        &self,
        approval_id: ApprovalId,
    ) -> impl Future<Output = Result<Vec<ApprovalEvent>>> + Send;
}

/// the main database implementation using sea-orm.
#[derive(Clone)]
pub struct ChainfundDb {
    conn: DatabaseConnection,
}

impl ChainfundDb {
    /// create a new database connection from config and run migrations.
    pub async fn new(config: &Config) -> Result<Self> {
        let url = Self::build_connection_url(&config.database)?;
        let conn: DatabaseConnection = SeaOrmDatabase::connect(&url)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let db = Self { conn };

        if config.database.db_type == "sqlite" && config.database.sqlite.write_ahead_log {
            db.enable_wal_mode().await?;
        }

        db.migrate().await?;
        Ok(db)
    }

    /// enable write-ahead logging mode for sqlite.
    async fn enable_wal_mode(&self) -> Result<()> {
        use sea_orm::ConnectionTrait;
        self.conn
            .execute_unprepared("PRAGMA journal_mode=WAL")
            .await
            .map_err(|e| Error::Connection(format!("failed to enable WAL mode: {}", e)))?;
        tracing::info!("sqlite WAL mode enabled");
        Ok(())
    }

    /// build a sea-orm compatible connection url from config.
    fn build_connection_url(config: &chainfund_types::DatabaseConfig) -> Result<String> {
        match config.db_type.as_str() {
            "sqlite" => {
                let path = if config.connection_string.starts_with("sqlite:") {
                    config.connection_string.clone()
                } else {
                    format!("sqlite:{}", config.connection_string)
                };
                // ?mode=rwc creates the file if it doesn't exist
                if path.contains('?') {
                    Ok(path)
                } else {
                    Ok(format!("{}?mode=rwc", path))
                }
            }
            "postgres" | "postgresql" => Ok(config.connection_string.clone()),
            other => Err(Error::InvalidData(format!(
                "unsupported database type: {}",
                other
            ))),
        }
    }

    /// create an in-memory sqlite database for testing.
    pub async fn new_in_memory() -> Result<Self> {
        let conn: DatabaseConnection = SeaOrmDatabase::connect("sqlite::memory:")
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let db = Self { conn };
        db.migrate().await?;
        Ok(db)
    }

    /// run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        migration::Migrator::up(&self.conn, None)
            .await
            .map_err(|e| Error::Migration(e.to_string()))?;
        Ok(())
    }
}

fn convert_all<M, T>(models: Vec<M>) -> Result<Vec<T>>
where
    T: TryFrom<M, Error = Error>,
{
    models.into_iter().map(T::try_from).collect()
}

impl Database for ChainfundDb {
    // health check

    async fn ping(&self) -> Result<()> {
        use sea_orm::ConnectionTrait;
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(())
    }

    // user operations

    async fn create_user(&self, user: &User) -> Result<User> {
        let model: entity::user::ActiveModel = user.into();
        let result = model.insert(&self.conn).await?;
        result.try_into()
    }

    async fn get_user_by_wallet(&self, wallet: &WalletAddress) -> Result<Option<User>> {
        entity::user::Entity::find()
            .filter(entity::user::Column::WalletAddress.eq(wallet.as_str()))
            .one(&self.conn)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        entity::user::Entity::find()
            .filter(entity::user::Column::Email.eq(email.to_lowercase()))
            .one(&self.conn)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let results = entity::user::Entity::find()
            .order_by_asc(entity::user::Column::Id)
            .all(&self.conn)
            .await?;
        convert_all(results)
    }

    async fn update_user(&self, user: &User) -> Result<User> {
        let mut model: entity::user::ActiveModel = user.into();
        model.updated_at = Set(Utc::now());
        let result = model.update(&self.conn).await?;
        result.try_into()
    }

    async fn claim_otp_attempt(&self, id: UserId, max_attempts: u32) -> Result<bool> {
        use entity::user::{Column, Entity};

        let result = Entity::update_many()
            .col_expr(Column::OtpAttempts, Expr::col(Column::OtpAttempts).add(1))
            .filter(Column::Id.eq(id.0 as i64))
            .filter(Column::OtpHash.is_not_null())
            .filter(Column::OtpAttempts.lt(max_attempts as i32))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected == 1)
    }

    // campaign operations

    async fn create_campaign(&self, campaign: &Campaign) -> Result<Campaign> {
        let model = entity::campaign::ActiveModel::try_from(campaign)?;
        let result = model.insert(&self.conn).await?;
        result.try_into()
    }

    async fn get_campaign(&self, id: CampaignId) -> Result<Option<Campaign>> {
        entity::campaign::Entity::find_by_id(id.0 as i64)
            .one(&self.conn)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn list_campaigns(&self) -> Result<Vec<Campaign>> {
        let results = entity::campaign::Entity::find()
            .order_by_desc(entity::campaign::Column::CreatedAt)
            .order_by_desc(entity::campaign::Column::Id)
            .all(&self.conn)
            .await?;
        convert_all(results)
    }

    async fn update_campaign(&self, campaign: &Campaign) -> Result<Campaign> {
        use sea_orm::ActiveValue::NotSet;

        let mut model = entity::campaign::ActiveModel::try_from(campaign)?;
        model.current_amount = NotSet;
        model.created_at = NotSet;
        model.updated_at = Set(Utc::now());
        let result = model.update(&self.conn).await?;
        result.try_into()
    }

    async fn delete_unused_campaign(&self, id: CampaignId) -> Result<bool> {
        use entity::campaign::{Column, Entity};
        use sea_orm::sea_query::Query;

        let with_approvals = Query::select()
            .column(entity::milestone_approval::Column::CampaignId)
            .from(entity::milestone_approval::Entity)
            .to_owned();

        let result = Entity::delete_many()
            .filter(Column::Id.eq(id.0 as i64))
            .filter(Column::CurrentAmount.eq(0i64))
            .filter(Column::Id.not_in_subquery(with_approvals))
            .exec(&self.conn)
            .await?;
        if result.rows_affected == 1 {
            return Ok(true);
        }

        match Entity::find_by_id(id.0 as i64).one(&self.conn).await? {
            Some(_) => Ok(false),
            None => Err(Error::NotFound(format!("campaign {}", id))),
        }
    }

    async fn record_donation(&self, donation: &Donation) -> Result<(Donation, Campaign)> {
        let txn = self.conn.begin().await?;

        let updated = entity::campaign::Entity::update_many()
            .col_expr(
                entity::campaign::Column::CurrentAmount,
                Expr::col(entity::campaign::Column::CurrentAmount)
                    .add(donation.amount.base_units()),
            )
            .col_expr(
                entity::campaign::Column::UpdatedAt,
                Expr::value(Utc::now()),
            )
            .filter(entity::campaign::Column::Id.eq(donation.campaign_id.0 as i64))
            .exec(&txn)
            .await?;
        if updated.rows_affected == 0 {
            return Err(Error::NotFound(format!("campaign {}", donation.campaign_id)));
        }

        let model: entity::donation::ActiveModel = donation.into();
        let stored = model.insert(&txn).await?;

        let campaign = entity::campaign::Entity::find_by_id(donation.campaign_id.0 as i64)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::NotFound(format!("campaign {}", donation.campaign_id)))?;

        txn.commit().await?;
        Ok((stored.try_into()?, campaign.try_into()?))
    }

    async fn list_donations(&self, campaign_id: CampaignId) -> Result<Vec<Donation>> {
        let results = entity::donation::Entity::find()
            .filter(entity::donation::Column::CampaignId.eq(campaign_id.0 as i64))
            .order_by_desc(entity::donation::Column::CreatedAt)
            .order_by_desc(entity::donation::Column::Id)
            .all(&self.conn)
            .await?;
        convert_all(results)
    }

    // approval operations

    async fn create_approval(&self, approval: &MilestoneApproval) -> Result<MilestoneApproval> {
        let model = entity::milestone_approval::ActiveModel::try_from(approval)?;
        let result = model.insert(&self.conn).await?;
        result.try_into()
    }

    async fn get_approval(&self, id: ApprovalId) -> Result<Option<MilestoneApproval>> {
        entity::milestone_approval::Entity::find_by_id(id.0 as i64)
            .one(&self.conn)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn find_open_approval(
        &self,
        campaign_id: CampaignId,
        milestone_index: u32,
    ) -> Result<Option<MilestoneApproval>> {
        use entity::milestone_approval::{Column, Entity};

        Entity::find()
            .filter(Column::CampaignId.eq(campaign_id.0 as i64))
            .filter(Column::MilestoneIndex.eq(milestone_index as i32))
            .filter(Column::Status.is_in([
                ApprovalStatus::Pending.as_str(),
                ApprovalStatus::AutoVerified.as_str(),
            ]))
            .order_by_desc(Column::Id)
            .one(&self.conn)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn latest_approval(
        &self,
        campaign_id: CampaignId,
        milestone_index: u32,
    ) -> Result<Option<MilestoneApproval>> {
        use entity::milestone_approval::{Column, Entity};

        Entity::find()
            .filter(Column::CampaignId.eq(campaign_id.0 as i64))
            .filter(Column::MilestoneIndex.eq(milestone_index as i32))
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .one(&self.conn)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn list_approvals_by_status(
        &self,
        status: ApprovalStatus,
    ) -> Result<Vec<MilestoneApproval>> {
        use entity::milestone_approval::{Column, Entity};

        let results = Entity::find()
            .filter(Column::Status.eq(status.as_str()))
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .all(&self.conn)
            .await?;
        convert_all(results)
    }

    async fn count_approvals_by_status(&self, status: ApprovalStatus) -> Result<u64> {
        let count = entity::milestone_approval::Entity::find()
            .filter(entity::milestone_approval::Column::Status.eq(status.as_str()))
            .count(&self.conn)
            .await?;
        Ok(count)
    }

    async fn count_approvals_for_campaign(&self, campaign_id: CampaignId) -> Result<u64> {
        let count = entity::milestone_approval::Entity::find()
            .filter(entity::milestone_approval::Column::CampaignId.eq(campaign_id.0 as i64))
            .count(&self.conn)
            .await?;
        Ok(count)
    }

    async fn refresh_auto_verified(
        &self,
        id: ApprovalId,
        notes: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        use entity::milestone_approval::{Column, Entity};

        let result = Entity::update_many()
            .col_expr(
                Column::Status,
                Expr::value(ApprovalStatus::AutoVerified.as_str()),
            )
            .col_expr(Column::AdminNotes, Expr::value(notes))
            .col_expr(Column::AutoVerifiedAt, Expr::value(at))
            .col_expr(Column::UpdatedAt, Expr::value(at))
            .filter(Column::Id.eq(id.0 as i64))
            .filter(Column::Status.is_in([
                ApprovalStatus::Pending.as_str(),
                ApprovalStatus::AutoVerified.as_str(),
            ]))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected == 1)
    }

    async fn decide_pending(&self, id: ApprovalId, update: &DecisionUpdate) -> Result<bool> {
        use entity::milestone_approval::{Column, Entity};

        let actor = update.actor.as_str();
        let mut query = Entity::update_many()
            .col_expr(
                Column::Status,
                Expr::value(update.decision.target_status().as_str()),
            )
            .col_expr(Column::AdminNotes, Expr::value(update.notes.clone()))
            .col_expr(Column::UpdatedAt, Expr::value(update.at));

        query = match update.decision {
            Decision::Approve => query
                .col_expr(Column::ApprovedBy, Expr::value(actor))
                .col_expr(Column::ApprovedAt, Expr::value(update.at)),
            Decision::Reject => query
                .col_expr(Column::RejectedBy, Expr::value(actor))
                .col_expr(Column::RejectedAt, Expr::value(update.at))
                .col_expr(Column::RejectionReason, Expr::value(update.notes.clone())),
        };

        let result = query
            .filter(Column::Id.eq(id.0 as i64))
            .filter(Column::Status.eq(ApprovalStatus::Pending.as_str()))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected == 1)
    }

    async fn set_transaction_hash(&self, id: ApprovalId, hash: &str) -> Result<bool> {
        use entity::milestone_approval::{Column, Entity};

        let result = Entity::update_many()
            .col_expr(Column::BlockchainTransactionHash, Expr::value(hash))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id.0 as i64))
            .filter(Column::BlockchainTransactionHash.is_null())
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected == 1)
    }

    // audit operations

    async fn create_approval_event(&self, event: &ApprovalEvent) -> Result<ApprovalEvent> {
        let model: entity::approval_event::ActiveModel = event.into();
        let result = model.insert(&self.conn).await?;
        result.try_into()
    }

    async fn list_approval_events(&self, approval_id: ApprovalId) -> Result<Vec<ApprovalEvent>> {
        let results = entity::approval_event::Entity::find()
            .filter(entity::approval_event::Column::ApprovalId.eq(approval_id.0 as i64))
            .order_by_asc(entity::approval_event::Column::Id)
            .all(&self.conn)
            .await?;
        convert_all(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainfund_types::test_utils::{TestCampaignBuilder, TestUserBuilder, eth, test_wallet};
    use chainfund_types::{ApprovalAction, UserRole};

    async fn setup_test_db() -> ChainfundDb {
        ChainfundDb::new_in_memory().await.unwrap()
    }

    async fn seeded_campaign(db: &ChainfundDb, targets: &[f64]) -> Campaign {
        let campaign = TestCampaignBuilder::new()
            .with_milestone_targets(targets)
            .build();
        db.create_campaign(&campaign).await.unwrap()
    }

    fn open_record(campaign: &Campaign, index: u32, status: ApprovalStatus) -> MilestoneApproval {
        MilestoneApproval::new(
            campaign.id,
            index,
            campaign.creator_wallet.clone(),
            campaign.cumulative_target(index).unwrap(),
            status,
        )
    }

    #[tokio::test]
    async fn test_user_crud() {
        let db = setup_test_db().await;

        let user = TestUserBuilder::new(7).with_name("grace").build();
        let created = db.create_user(&user).await.unwrap();
        assert!(created.id.0 > 0);

        let by_wallet = db.get_user_by_wallet(&test_wallet(7)).await.unwrap().unwrap();
        assert_eq!(by_wallet.name, "grace");

        let by_email = db
            .get_user_by_email("GRACE@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, created.id);

        let mut promoted = by_email.clone();
        promoted.role = UserRole::Admin;
        let updated = db.update_user(&promoted).await.unwrap();
        assert!(updated.is_admin());

        assert_eq!(db.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_wallet_is_already_exists() {
        let db = setup_test_db().await;
        db.create_user(&TestUserBuilder::new(1).with_name("a").build())
            .await
            .unwrap();

        let err = db
            .create_user(&TestUserBuilder::new(1).with_name("b").build())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_campaign_roundtrip_keeps_milestones() {
        let db = setup_test_db().await;
        let created = seeded_campaign(&db, &[3.0, 5.0, 2.0]).await;

        let fetched = db.get_campaign(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.milestones.len(), 3);
        assert_eq!(fetched.cumulative_target(1).unwrap(), eth("8"));
        assert_eq!(fetched.goal_amount, eth("10"));
    }

    #[tokio::test]
    async fn test_update_campaign_does_not_touch_funding() {
        let db = setup_test_db().await;
        let created = seeded_campaign(&db, &[4.0]).await;

        let donation = Donation {
            id: 0,
            campaign_id: created.id,
            donor_wallet: test_wallet(9),
            amount: eth("2.5"),
            transaction_hash: None,
            created_at: Utc::now(),
        };
        db.record_donation(&donation).await.unwrap();

        // stale copy still says nothing raised
        let mut edited = created.clone();
        edited.title = "renamed".to_string();
        let updated = db.update_campaign(&edited).await.unwrap();

        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.current_amount, eth("2.5"));
    }

    #[tokio::test]
    async fn test_record_donation_increments_total() {
        let db = setup_test_db().await;
        let campaign = seeded_campaign(&db, &[10.0]).await;

        for amount in [eth("1.5"), eth("2"), eth("0.5")] {
            let donation = Donation {
                id: 0,
                campaign_id: campaign.id,
                donor_wallet: test_wallet(2),
                amount,
                transaction_hash: Some("0xabc".to_string()),
                created_at: Utc::now(),
            };
            db.record_donation(&donation).await.unwrap();
        }

        let fetched = db.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(fetched.current_amount, eth("4"));
        assert_eq!(db.list_donations(campaign.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_fractional_donations_sum_exactly() {
        let db = setup_test_db().await;
        let campaign = seeded_campaign(&db, &[0.1, 0.2]).await;
        assert_eq!(campaign.goal_amount, eth("0.3"));

        for amount in [eth("0.1"), eth("0.2")] {
            let donation = Donation {
                id: 0,
                campaign_id: campaign.id,
                donor_wallet: test_wallet(2),
                amount,
                transaction_hash: None,
                created_at: Utc::now(),
            };
            db.record_donation(&donation).await.unwrap();
        }

        let fetched = db.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(fetched.current_amount, fetched.cumulative_target(1).unwrap());
        assert_eq!(fetched.current_amount.to_string(), "0.3");
    }

    #[tokio::test]
    async fn test_record_donation_unknown_campaign() {
        let db = setup_test_db().await;
        let donation = Donation {
            id: 0,
            campaign_id: CampaignId(404),
            donor_wallet: test_wallet(2),
            amount: eth("1"),
            transaction_hash: None,
            created_at: Utc::now(),
        };
        let err = db.record_donation(&donation).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_second_open_record_rejected_by_index() {
        let db = setup_test_db().await;
        let campaign = seeded_campaign(&db, &[3.0, 5.0]).await;

        db.create_approval(&open_record(&campaign, 0, ApprovalStatus::Pending))
            .await
            .unwrap();

        let err = db
            .create_approval(&open_record(&campaign, 0, ApprovalStatus::AutoVerified))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)), "got {err:?}");

        // other milestones are unaffected
        db.create_approval(&open_record(&campaign, 1, ApprovalStatus::Pending))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_terminal_records_do_not_block_new_ones() {
        let db = setup_test_db().await;
        let campaign = seeded_campaign(&db, &[3.0]).await;

        let first = db
            .create_approval(&open_record(&campaign, 0, ApprovalStatus::Pending))
            .await
            .unwrap();
        let update = DecisionUpdate {
            decision: Decision::Reject,
            actor: test_wallet(99),
            notes: Some("missing invoices".to_string()),
            at: Utc::now(),
        };
        assert!(db.decide_pending(first.id, &update).await.unwrap());

        let second = db
            .create_approval(&open_record(&campaign, 0, ApprovalStatus::Pending))
            .await
            .unwrap();

        let latest = db.latest_approval(campaign.id, 0).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(
            db.find_open_approval(campaign.id, 0)
                .await
                .unwrap()
                .unwrap()
                .id,
            second.id
        );
    }

    #[tokio::test]
    async fn test_decide_pending_is_conditional() {
        let db = setup_test_db().await;
        let campaign = seeded_campaign(&db, &[3.0]).await;
        let record = db
            .create_approval(&open_record(&campaign, 0, ApprovalStatus::Pending))
            .await
            .unwrap();

        let update = DecisionUpdate {
            decision: Decision::Approve,
            actor: test_wallet(99),
            notes: None,
            at: Utc::now(),
        };
        assert!(db.decide_pending(record.id, &update).await.unwrap());
        assert!(!db.decide_pending(record.id, &update).await.unwrap());

        let stored = db.get_approval(record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ApprovalStatus::Approved);
        assert_eq!(stored.approved_by, Some(test_wallet(99)));
        assert!(stored.approved_at.is_some());
        assert!(stored.rejected_at.is_none());
    }

    #[tokio::test]
    async fn test_reject_stores_reason() {
        let db = setup_test_db().await;
        let campaign = seeded_campaign(&db, &[3.0]).await;
        let record = db
            .create_approval(&open_record(&campaign, 0, ApprovalStatus::Pending))
            .await
            .unwrap();

        let update = DecisionUpdate {
            decision: Decision::Reject,
            actor: test_wallet(99),
            notes: Some("receipts unreadable".to_string()),
            at: Utc::now(),
        };
        assert!(db.decide_pending(record.id, &update).await.unwrap());

        let stored = db.get_approval(record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ApprovalStatus::Rejected);
        assert_eq!(stored.rejection_reason.as_deref(), Some("receipts unreadable"));
        assert_eq!(stored.rejected_by, Some(test_wallet(99)));
        assert!(stored.approved_at.is_none());
    }

    #[tokio::test]
    async fn test_refresh_only_touches_open_records() {
        let db = setup_test_db().await;
        let campaign = seeded_campaign(&db, &[3.0]).await;
        let record = db
            .create_approval(&open_record(&campaign, 0, ApprovalStatus::Pending))
            .await
            .unwrap();

        let at = Utc::now();
        assert!(db.refresh_auto_verified(record.id, "target met", at).await.unwrap());
        let stored = db.get_approval(record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ApprovalStatus::AutoVerified);
        assert_eq!(stored.admin_notes.as_deref(), Some("target met"));

        // auto_verified records cannot be decided through decide_pending
        let update = DecisionUpdate {
            decision: Decision::Approve,
            actor: test_wallet(99),
            notes: None,
            at,
        };
        assert!(!db.decide_pending(record.id, &update).await.unwrap());
    }

    #[tokio::test]
    async fn test_transaction_hash_set_once() {
        let db = setup_test_db().await;
        let campaign = seeded_campaign(&db, &[3.0]).await;
        let record = db
            .create_approval(&open_record(&campaign, 0, ApprovalStatus::Pending))
            .await
            .unwrap();

        assert!(db.set_transaction_hash(record.id, "0x01").await.unwrap());
        assert!(!db.set_transaction_hash(record.id, "0x02").await.unwrap());

        let stored = db.get_approval(record.id).await.unwrap().unwrap();
        assert_eq!(stored.blockchain_transaction_hash.as_deref(), Some("0x01"));
    }

    #[tokio::test]
    async fn test_counts_and_listing_by_status() {
        let db = setup_test_db().await;
        let campaign = seeded_campaign(&db, &[1.0, 1.0, 1.0]).await;

        db.create_approval(&open_record(&campaign, 0, ApprovalStatus::Pending))
            .await
            .unwrap();
        db.create_approval(&open_record(&campaign, 1, ApprovalStatus::Pending))
            .await
            .unwrap();
        db.create_approval(&open_record(&campaign, 2, ApprovalStatus::AutoVerified))
            .await
            .unwrap();

        assert_eq!(
            db.count_approvals_by_status(ApprovalStatus::Pending)
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            db.count_approvals_by_status(ApprovalStatus::AutoVerified)
                .await
                .unwrap(),
            1
        );
        assert_eq!(db.count_approvals_for_campaign(campaign.id).await.unwrap(), 3);

        let pending = db
            .list_approvals_by_status(ApprovalStatus::Pending)
            .await
            .unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|a| a.status == ApprovalStatus::Pending));
    }

    #[tokio::test]
    async fn test_approval_events_in_order() {
        let db = setup_test_db().await;
        let campaign = seeded_campaign(&db, &[3.0]).await;
        let record = db
            .create_approval(&open_record(&campaign, 0, ApprovalStatus::Pending))
            .await
            .unwrap();

        db.create_approval_event(&ApprovalEvent::new(
            record.id,
            ApprovalAction::Requested,
            campaign.creator_wallet.as_str(),
            "2 documents",
        ))
        .await
        .unwrap();
        db.create_approval_event(&ApprovalEvent::system(
            record.id,
            ApprovalAction::Refreshed,
            "target met",
        ))
        .await
        .unwrap();

        let events = db.list_approval_events(record.id).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, ApprovalAction::Requested);
        assert_eq!(events[1].actor, "system");
    }

    #[tokio::test]
    async fn test_delete_unused_campaign() {
        let db = setup_test_db().await;
        let campaign = seeded_campaign(&db, &[3.0]).await;

        assert!(db.delete_unused_campaign(campaign.id).await.unwrap());
        assert!(db.get_campaign(campaign.id).await.unwrap().is_none());
        assert!(matches!(
            db.delete_unused_campaign(campaign.id).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_keeps_funded_campaign_and_donations() {
        let db = setup_test_db().await;
        let campaign = seeded_campaign(&db, &[3.0]).await;
        let donation = Donation {
            id: 0,
            campaign_id: campaign.id,
            donor_wallet: test_wallet(4),
            amount: eth("0.5"),
            transaction_hash: None,
            created_at: Utc::now(),
        };
        db.record_donation(&donation).await.unwrap();

        assert!(!db.delete_unused_campaign(campaign.id).await.unwrap());
        let stored = db.get_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.current_amount, eth("0.5"));
        assert_eq!(db.list_donations(campaign.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_keeps_campaign_with_approvals() {
        let db = setup_test_db().await;
        let campaign = seeded_campaign(&db, &[3.0]).await;
        db.create_approval(&open_record(&campaign, 0, ApprovalStatus::Pending))
            .await
            .unwrap();

        assert!(!db.delete_unused_campaign(campaign.id).await.unwrap());
        assert!(db.get_campaign(campaign.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_otp_attempts_are_capped() {
        let db = setup_test_db().await;
        let mut user = db
            .create_user(&TestUserBuilder::new(5).with_name("eve").build())
            .await
            .unwrap();

        // nothing outstanding, nothing to guess at
        assert!(!db.claim_otp_attempt(user.id, 3).await.unwrap());

        user.otp_hash = Some("hash".to_string());
        user.otp_expires_at = Some(Utc::now() + chrono::Duration::minutes(5));
        let user = db.update_user(&user).await.unwrap();

        for _ in 0..3 {
            assert!(db.claim_otp_attempt(user.id, 3).await.unwrap());
        }
        assert!(!db.claim_otp_attempt(user.id, 3).await.unwrap());

        let stored = db.get_user_by_wallet(&test_wallet(5)).await.unwrap().unwrap();
        assert_eq!(stored.otp_attempts, 3);
    }

    #[tokio::test]
    async fn test_sqlite_file_database_with_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("chainfund.db");

        let mut config = Config::default();
        config.database.connection_string = db_path.to_string_lossy().to_string();
        config.database.sqlite.write_ahead_log = true;

        let db = ChainfundDb::new(&config).await.unwrap();
        db.ping().await.unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn test_build_connection_url() {
        let mut config = chainfund_types::DatabaseConfig::default();
        config.connection_string = "/tmp/x.db".to_string();
        assert_eq!(
            ChainfundDb::build_connection_url(&config).unwrap(),
            "sqlite:/tmp/x.db?mode=rwc"
        );

        config.db_type = "postgres".to_string();
        config.connection_string = "postgres://u:p@h/db".to_string();
        assert_eq!(
            ChainfundDb::build_connection_url(&config).unwrap(),
            "postgres://u:p@h/db"
        );

        config.db_type = "mysql".to_string();
        assert!(ChainfundDb::build_connection_url(&config).is_err());
    }
}
