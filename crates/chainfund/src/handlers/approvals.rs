//! milestone approval endpoints.
//!
//! thin wrappers over [`chainfund_approvals::ApprovalEngine`]; every rule
//! about who may do what lives in the engine.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use chainfund_approvals::MilestoneRequest;
use chainfund_types::{
    Amount, ApprovalEvent, ApprovalId, ApprovalStatus, CampaignId, Decision, MilestoneApproval,
    WalletAddress,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::handlers::{ApiError, ApiResponse, JsonBody};

/// approval record representation in api responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApprovalResponse {
    pub id: u64,
    pub campaign_id: u64,
    pub milestone_index: u32,
    pub creator_wallet: WalletAddress,
    pub requested_amount: Amount,
    pub documents: Vec<String>,
    pub status: ApprovalStatus,
    pub admin_notes: Option<String>,
    pub approved_by: Option<WalletAddress>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<WalletAddress>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub auto_verified_at: Option<DateTime<Utc>>,
    pub blockchain_transaction_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MilestoneApproval> for ApprovalResponse {
    fn from(a: MilestoneApproval) -> Self {
        Self {
            id: a.id.0,
            campaign_id: a.campaign_id.0,
            milestone_index: a.milestone_index,
            creator_wallet: a.creator_wallet,
            requested_amount: a.requested_amount,
            documents: a.documents,
            status: a.status,
            admin_notes: a.admin_notes,
            approved_by: a.approved_by,
            approved_at: a.approved_at,
            rejected_by: a.rejected_by,
            rejected_at: a.rejected_at,
            rejection_reason: a.rejection_reason,
            auto_verified_at: a.auto_verified_at,
            blockchain_transaction_hash: a.blockchain_transaction_hash,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

/// audit event representation in api responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventResponse {
    pub id: u64,
    pub action: String,
    pub actor: String,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

impl From<ApprovalEvent> for EventResponse {
    fn from(e: ApprovalEvent) -> Self {
        Self {
            id: e.id,
            action: e.action.as_str().to_string(),
            actor: e.actor,
            details: e.details,
            created_at: e.created_at,
        }
    }
}

/// identifies a milestone. fields are optional so a missing one yields a
/// specific 400 rather than a generic parse error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MilestoneRef {
    #[serde(default)]
    pub campaign_id: Option<u64>,
    #[serde(default)]
    pub milestone_index: Option<u32>,
}

impl MilestoneRef {
    fn require(&self) -> Result<(CampaignId, u32), ApiError> {
        match (self.campaign_id, self.milestone_index) {
            (Some(c), Some(i)) => Ok((CampaignId(c), i)),
            _ => Err(ApiError::bad_request(
                "campaignId and milestoneIndex are required",
            )),
        }
    }
}

/// request body for a creator's approval request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitRequest {
    #[serde(flatten)]
    pub milestone: MilestoneRef,
    #[serde(default)]
    pub creator_wallet: Option<WalletAddress>,
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(default)]
    pub requested_amount: Option<Amount>,
}

/// request body for admin decisions.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DecisionRequest {
    #[serde(default)]
    pub admin_wallet: Option<WalletAddress>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// response payload for auto-verification.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AutoVerifyResponse {
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApprovalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_verified_at: Option<DateTime<Utc>>,
    pub target_amount: Amount,
    pub current_amount: Amount,
    pub milestone_target: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<Amount>,
}

/// response for the status query.
#[derive(Debug, Serialize)]
pub(crate) struct StatusResponse {
    pub success: bool,
    /// the latest record's status, or `"none"`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ApprovalResponse>,
}

/// response payload for an approval.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApprovedResponse {
    pub id: u64,
    pub status: ApprovalStatus,
    pub approved_by: Option<WalletAddress>,
    pub approved_at: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
    pub blockchain_transaction_hash: Option<String>,
}

/// response payload for a rejection.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RejectedResponse {
    pub id: u64,
    pub status: ApprovalStatus,
    pub rejected_by: Option<WalletAddress>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

/// create the milestone approval router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/request", post(submit_request))
        .route("/auto-verify", post(auto_verify))
        .route("/check-status", post(check_status))
        .route("/{id}/approve", put(approve))
        .route("/{id}/reject", put(reject))
        .route("/{id}/history", get(history))
}

/// `POST /api/milestone-approval/request`
async fn submit_request(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SubmitRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ApprovalResponse>>), ApiError> {
    let (campaign_id, milestone_index) = req.milestone.require()?;
    let creator_wallet = req
        .creator_wallet
        .ok_or_else(|| ApiError::bad_request("creatorWallet is required"))?;

    let record = state
        .engine
        .submit_request(MilestoneRequest {
            campaign_id,
            milestone_index,
            creator_wallet,
            documents: req.documents,
            requested_amount: req.requested_amount,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(
            "milestone approval requested",
            ApprovalResponse::from(record),
        ),
    ))
}

/// `POST /api/milestone-approval/auto-verify`
async fn auto_verify(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<MilestoneRef>,
) -> Result<Json<ApiResponse<AutoVerifyResponse>>, ApiError> {
    let (campaign_id, milestone_index) = req.require()?;
    let outcome = state
        .engine
        .check_auto_verify(campaign_id, milestone_index)
        .await?;

    let message = if outcome.is_eligible() {
        "milestone auto-verified"
    } else {
        "milestone not yet eligible for auto-verification"
    };
    let approval = outcome.approval.as_ref();
    let data = AutoVerifyResponse {
        eligible: outcome.is_eligible(),
        id: approval.map(|a| a.id.0),
        status: approval.map(|a| a.status),
        auto_verified_at: approval.and_then(|a| a.auto_verified_at),
        target_amount: outcome.cumulative_target,
        current_amount: outcome.current_amount,
        milestone_target: outcome.milestone_target,
        remaining: outcome.remaining,
    };

    Ok(ApiResponse::with_message(message, data))
}

/// `POST /api/milestone-approval/check-status`
async fn check_status(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<MilestoneRef>,
) -> Result<Json<StatusResponse>, ApiError> {
    let (campaign_id, milestone_index) = req.require()?;
    let latest = state.engine.status(campaign_id, milestone_index).await?;

    Ok(Json(match latest {
        Some(record) => StatusResponse {
            success: true,
            status: record.status.as_str().to_string(),
            data: Some(ApprovalResponse::from(record)),
        },
        None => StatusResponse {
            success: true,
            status: "none".to_string(),
            data: None,
        },
    }))
}

fn require_admin(req: &DecisionRequest) -> Result<&WalletAddress, ApiError> {
    req.admin_wallet
        .as_ref()
        .ok_or_else(|| ApiError::bad_request("adminWallet is required"))
}

/// `PUT /api/milestone-approval/{id}/approve`
async fn approve(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    JsonBody(req): JsonBody<DecisionRequest>,
) -> Result<Json<ApiResponse<ApprovedResponse>>, ApiError> {
    let admin = require_admin(&req)?;
    let record = state
        .engine
        .decide(ApprovalId(id), Decision::Approve, admin, req.notes.as_deref())
        .await?;

    Ok(ApiResponse::with_message(
        "milestone approved",
        ApprovedResponse {
            id: record.id.0,
            status: record.status,
            approved_by: record.approved_by,
            approved_at: record.approved_at,
            admin_notes: record.admin_notes,
            blockchain_transaction_hash: record.blockchain_transaction_hash,
        },
    ))
}

/// `PUT /api/milestone-approval/{id}/reject`
async fn reject(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    JsonBody(req): JsonBody<DecisionRequest>,
) -> Result<Json<ApiResponse<RejectedResponse>>, ApiError> {
    let admin = require_admin(&req)?;
    let record = state
        .engine
        .decide(ApprovalId(id), Decision::Reject, admin, req.notes.as_deref())
        .await?;

    Ok(ApiResponse::with_message(
        "milestone rejected",
        RejectedResponse {
            id: record.id.0,
            status: record.status,
            rejected_by: record.rejected_by,
            rejected_at: record.rejected_at,
            rejection_reason: record.rejection_reason,
        },
    ))
}

/// `GET /api/milestone-approval/{id}/history`
async fn history(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ApiResponse<Vec<EventResponse>>>, ApiError> {
    let events = state.engine.history(ApprovalId(id)).await?;
    Ok(ApiResponse::ok(
        events.into_iter().map(EventResponse::from).collect(),
    ))
}
