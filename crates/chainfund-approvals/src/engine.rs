//! the milestone approval engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use chainfund_db::{Database, DecisionUpdate};
use chainfund_types::{
    Amount, ApprovalAction, ApprovalEvent, ApprovalId, ApprovalStatus, Campaign, CampaignId,
    Decision, MilestoneApproval, WalletAddress,
};

use crate::chain::{ChainRequest, ChainVerifierBoxed};
use crate::error::{Error, Result};

/// result of an auto-verification check.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoVerifyOutcome {
    /// the created or refreshed record, when the milestone is eligible.
    pub approval: Option<MilestoneApproval>,
    /// sum of the targets of this milestone and every milestone before it.
    pub cumulative_target: Amount,
    /// amount raised by the campaign so far.
    pub current_amount: Amount,
    /// the milestone's own target.
    pub milestone_target: Amount,
    /// how much is still missing, when not eligible.
    pub remaining: Option<Amount>,
}

impl AutoVerifyOutcome {
    /// whether the campaign has raised enough to release the milestone.
    pub fn is_eligible(&self) -> bool {
        self.approval.is_some()
    }
}

/// a creator's request to release a milestone.
#[derive(Debug, Clone)]
pub struct MilestoneRequest {
    /// campaign the milestone belongs to.
    pub campaign_id: CampaignId,
    /// zero-based milestone position.
    pub milestone_index: u32,
    /// the requesting wallet; must own the campaign.
    pub creator_wallet: WalletAddress,
    /// supporting document urls.
    pub documents: Vec<String>,
    /// amount to release; defaults to the cumulative target.
    pub requested_amount: Option<Amount>,
}

/// counts per status and mean decision latency.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalStats {
    /// records awaiting an admin.
    pub total_pending: u64,
    /// records approved by an admin.
    pub total_approved: u64,
    /// records rejected by an admin.
    pub total_rejected: u64,
    /// records released automatically.
    pub total_auto_verified: u64,
    /// mean hours from creation to decision over approved and rejected records.
    pub average_processing_time: f64,
}

/// the admin review queue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingApprovals {
    /// pending records, newest first.
    pub approvals: Vec<MilestoneApproval>,
    /// queue statistics.
    pub stats: ApprovalStats,
}

/// milestone approval engine.
///
/// cheap to clone; every method takes `&self`. all state lives in the
/// store and every transition is a single conditional write, so several
/// engines may safely share one database.
#[derive(Clone)]
pub struct ApprovalEngine<D> {
    db: D,
    chain: Option<Arc<dyn ChainVerifierBoxed>>,
}

impl<D: Database + Clone> ApprovalEngine<D> {
    /// create an engine with no chain verifier.
    pub fn new(db: D) -> Self {
        Self { db, chain: None }
    }

    /// attach a chain verifier, called once after each approval.
    pub fn with_chain(mut self, chain: Option<Arc<dyn ChainVerifierBoxed>>) -> Self {
        self.chain = chain;
        self
    }

    /// the underlying store.
    pub fn db(&self) -> &D {
        &self.db
    }

    async fn load_campaign(&self, campaign_id: CampaignId) -> Result<Campaign> {
        self.db
            .get_campaign(campaign_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("campaign {} not found", campaign_id)))
    }

    async fn record_event(&self, event: ApprovalEvent) -> Result<()> {
        self.db.create_approval_event(&event).await?;
        Ok(())
    }

    /// release a milestone automatically if its cumulative target is met.
    ///
    /// creates at most one record, or refreshes the open one in place. the
    /// campaign itself is never modified.
    pub async fn check_auto_verify(
        &self,
        campaign_id: CampaignId,
        milestone_index: u32,
    ) -> Result<AutoVerifyOutcome> {
        let campaign = self.load_campaign(campaign_id).await?;
        let cumulative_target = cumulative_target_of(&campaign, milestone_index)?;
        let milestone_target = campaign.milestones[milestone_index as usize].target_amount;
        let current_amount = campaign.current_amount;

        let mut outcome = AutoVerifyOutcome {
            approval: None,
            cumulative_target,
            current_amount,
            milestone_target,
            remaining: None,
        };

        if current_amount < cumulative_target {
            debug!(
                campaign_id = %campaign_id,
                milestone_index,
                %cumulative_target,
                %current_amount,
                "milestone not yet eligible"
            );
            outcome.remaining = cumulative_target.checked_sub(current_amount);
            return Ok(outcome);
        }

        let notes = format!(
            "cumulative target {} reached with {} raised",
            cumulative_target, current_amount
        );
        let now = Utc::now();

        let approval = match self.db.find_open_approval(campaign_id, milestone_index).await? {
            Some(open) => self.refresh(open.id, &notes, now).await?,
            None => {
                let mut record = MilestoneApproval::new(
                    campaign_id,
                    milestone_index,
                    campaign.creator_wallet.clone(),
                    cumulative_target,
                    ApprovalStatus::AutoVerified,
                );
                record.admin_notes = Some(notes.clone());
                record.auto_verified_at = Some(now);

                match self.db.create_approval(&record).await {
                    Ok(created) => {
                        self.record_event(ApprovalEvent::system(
                            created.id,
                            ApprovalAction::AutoVerified,
                            notes.as_str(),
                        ))
                        .await?;
                        info!(
                            approval_id = %created.id,
                            campaign_id = %campaign_id,
                            milestone_index,
                            "milestone auto-verified"
                        );
                        created
                    }
                    Err(chainfund_db::Error::AlreadyExists(_)) => {
                        // another request created the open record first
                        let winner = self
                            .db
                            .find_open_approval(campaign_id, milestone_index)
                            .await?
                            .ok_or_else(|| {
                                Error::Conflict(format!(
                                    "milestone {} of campaign {} changed concurrently",
                                    milestone_index, campaign_id
                                ))
                            })?;
                        self.refresh(winner.id, &notes, now).await?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        outcome.approval = Some(approval);
        Ok(outcome)
    }

    async fn refresh(
        &self,
        id: ApprovalId,
        notes: &str,
        now: DateTime<Utc>,
    ) -> Result<MilestoneApproval> {
        if !self.db.refresh_auto_verified(id, notes, now).await? {
            return Err(Error::Conflict(format!(
                "approval {} was decided concurrently",
                id
            )));
        }
        self.record_event(ApprovalEvent::system(id, ApprovalAction::Refreshed, notes))
            .await?;
        info!(approval_id = %id, "auto-verification refreshed");

        self.db
            .get_approval(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("approval {} not found", id)))
    }

    /// open a pending record for admin review.
    pub async fn submit_request(&self, request: MilestoneRequest) -> Result<MilestoneApproval> {
        let campaign = self.load_campaign(request.campaign_id).await?;
        let cumulative_target = cumulative_target_of(&campaign, request.milestone_index)?;

        if campaign.creator_wallet != request.creator_wallet {
            warn!(
                campaign_id = %request.campaign_id,
                wallet = %request.creator_wallet,
                "milestone request from non-creator"
            );
            return Err(Error::Authorization(
                "only the campaign creator can request milestone approval".to_string(),
            ));
        }

        let documents: Vec<String> = request
            .documents
            .iter()
            .map(|d| d.trim().to_string())
            .collect();
        if documents.is_empty() {
            return Err(Error::Validation(
                "at least one supporting document is required".to_string(),
            ));
        }
        for doc in &documents {
            url::Url::parse(doc)
                .map_err(|_| Error::Validation(format!("invalid document url: {}", doc)))?;
        }

        let requested_amount = request.requested_amount.unwrap_or(cumulative_target);
        if !requested_amount.is_positive() {
            return Err(Error::Validation(
                "requested amount must be positive".to_string(),
            ));
        }

        if let Some(open) = self
            .db
            .find_open_approval(request.campaign_id, request.milestone_index)
            .await?
        {
            return Err(Error::Conflict(format!(
                "milestone already has an open approval ({}, status {})",
                open.id, open.status
            )));
        }

        let mut record = MilestoneApproval::new(
            request.campaign_id,
            request.milestone_index,
            request.creator_wallet.clone(),
            requested_amount,
            ApprovalStatus::Pending,
        );
        record.documents = documents;

        let created = self.db.create_approval(&record).await.map_err(|e| match e {
            chainfund_db::Error::AlreadyExists(_) => {
                Error::Conflict("milestone already has an open approval".to_string())
            }
            other => other.into(),
        })?;

        self.record_event(ApprovalEvent::new(
            created.id,
            ApprovalAction::Requested,
            request.creator_wallet.as_str(),
            format!("{} document(s), requested {}", created.documents.len(), requested_amount),
        ))
        .await?;

        info!(
            approval_id = %created.id,
            campaign_id = %created.campaign_id,
            milestone_index = created.milestone_index,
            "milestone approval requested"
        );
        Ok(created)
    }

    /// apply an admin decision to a pending record.
    ///
    /// the transition only succeeds if the record is still pending when the
    /// write lands, so of two concurrent decisions exactly one wins.
    pub async fn decide(
        &self,
        approval_id: ApprovalId,
        decision: Decision,
        actor: &WalletAddress,
        notes: Option<&str>,
    ) -> Result<MilestoneApproval> {
        let notes = notes.map(str::trim).filter(|n| !n.is_empty());
        if decision == Decision::Reject && notes.is_none() {
            return Err(Error::Validation(
                "a rejection reason is required".to_string(),
            ));
        }

        let is_admin = self
            .db
            .get_user_by_wallet(actor)
            .await?
            .is_some_and(|u| u.is_admin());
        if !is_admin {
            warn!(wallet = %actor, approval_id = %approval_id, "decision attempted by non-admin");
            return Err(Error::Authorization("admin access required".to_string()));
        }

        let record = self
            .db
            .get_approval(approval_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("approval {} not found", approval_id)))?;
        if record.status != ApprovalStatus::Pending {
            return Err(Error::Conflict(format!(
                "approval {} is {}, only pending approvals can be decided",
                approval_id, record.status
            )));
        }

        let update = DecisionUpdate {
            decision,
            actor: actor.clone(),
            notes: notes.map(str::to_string),
            at: Utc::now(),
        };
        if !self.db.decide_pending(approval_id, &update).await? {
            return Err(Error::Conflict(format!(
                "approval {} was decided concurrently",
                approval_id
            )));
        }

        let action = match decision {
            Decision::Approve => ApprovalAction::Approved,
            Decision::Reject => ApprovalAction::Rejected,
        };
        self.record_event(ApprovalEvent::new(
            approval_id,
            action,
            actor.as_str(),
            notes.unwrap_or_default(),
        ))
        .await?;
        info!(
            approval_id = %approval_id,
            admin = %actor,
            status = %decision.target_status(),
            "approval decided"
        );

        if decision == Decision::Approve {
            self.submit_on_chain(&record).await?;
        }

        self.db
            .get_approval(approval_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("approval {} not found", approval_id)))
    }

    /// hand an approved record to the chain verifier. failures are recorded
    /// in the audit trail and never undo the approval.
    async fn submit_on_chain(&self, record: &MilestoneApproval) -> Result<()> {
        let Some(chain) = &self.chain else {
            debug!(approval_id = %record.id, "no chain verifier configured");
            return Ok(());
        };

        let request = ChainRequest {
            approval_id: record.id,
            campaign_id: record.campaign_id,
            milestone_index: record.milestone_index,
            creator_wallet: record.creator_wallet.clone(),
            amount: record.requested_amount,
        };

        match chain.verify_milestone(request).await {
            Ok(hash) => {
                self.db.set_transaction_hash(record.id, &hash).await?;
                self.record_event(ApprovalEvent::system(
                    record.id,
                    ApprovalAction::ChainVerified,
                    hash.as_str(),
                ))
                .await?;
                info!(approval_id = %record.id, tx = %hash, "milestone verified on-chain");
            }
            Err(e) => {
                warn!(approval_id = %record.id, error = %e, "on-chain verification failed");
                self.record_event(ApprovalEvent::system(
                    record.id,
                    ApprovalAction::ChainFailed,
                    e.to_string(),
                ))
                .await?;
            }
        }
        Ok(())
    }

    /// the most recent record for a milestone, if any.
    pub async fn status(
        &self,
        campaign_id: CampaignId,
        milestone_index: u32,
    ) -> Result<Option<MilestoneApproval>> {
        Ok(self.db.latest_approval(campaign_id, milestone_index).await?)
    }

    /// pending records and queue statistics.
    pub async fn list_pending_with_stats(&self) -> Result<PendingApprovals> {
        let approvals = self
            .db
            .list_approvals_by_status(ApprovalStatus::Pending)
            .await?;

        let mut decided = self
            .db
            .list_approvals_by_status(ApprovalStatus::Approved)
            .await?;
        decided.extend(
            self.db
                .list_approvals_by_status(ApprovalStatus::Rejected)
                .await?,
        );

        let stats = ApprovalStats {
            total_pending: approvals.len() as u64,
            total_approved: self
                .db
                .count_approvals_by_status(ApprovalStatus::Approved)
                .await?,
            total_rejected: self
                .db
                .count_approvals_by_status(ApprovalStatus::Rejected)
                .await?,
            total_auto_verified: self
                .db
                .count_approvals_by_status(ApprovalStatus::AutoVerified)
                .await?,
            average_processing_time: average_hours(&decided),
        };

        Ok(PendingApprovals { approvals, stats })
    }

    /// audit events for a record, oldest first.
    pub async fn history(&self, approval_id: ApprovalId) -> Result<Vec<ApprovalEvent>> {
        if self.db.get_approval(approval_id).await?.is_none() {
            return Err(Error::NotFound(format!(
                "approval {} not found",
                approval_id
            )));
        }
        Ok(self.db.list_approval_events(approval_id).await?)
    }
}

/// sum of a milestone's target and every target before it.
fn cumulative_target_of(campaign: &Campaign, milestone_index: u32) -> Result<Amount> {
    campaign
        .cumulative_target(milestone_index)
        .map_err(|e| match e {
            chainfund_types::Error::AmountOverflow => {
                Error::Validation("milestone targets overflow".to_string())
            }
            _ => Error::NotFound(format!(
                "milestone {} not found in campaign {}",
                milestone_index, campaign.id
            )),
        })
}

/// mean hours between creation and decision; 0 for an empty set.
fn average_hours(decided: &[MilestoneApproval]) -> f64 {
    let durations: Vec<f64> = decided
        .iter()
        .filter_map(|a| a.decided_at().map(|at| at - a.created_at))
        .map(|d| d.num_milliseconds() as f64 / 3_600_000.0)
        .collect();

    if durations.is_empty() {
        return 0.0;
    }
    durations.iter().sum::<f64>() / durations.len() as f64
}
