//! campaign and donation endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use chainfund_db::Database;
use chainfund_types::{Amount, Campaign, CampaignId, Donation, Milestone, WalletAddress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::AppState;
use crate::handlers::{ApiError, ApiResponse, JsonBody, OptionExt, ResultExt};

/// maximum length for a campaign title (characters).
const MAX_TITLE_LEN: usize = 200;

/// campaign representation in api responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CampaignResponse {
    pub id: u64,
    pub creator_wallet: WalletAddress,
    pub title: String,
    pub description: String,
    pub goal_amount: Amount,
    pub current_amount: Amount,
    pub image_url: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub milestones: Vec<Milestone>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Campaign> for CampaignResponse {
    fn from(c: Campaign) -> Self {
        Self {
            id: c.id.0,
            creator_wallet: c.creator_wallet,
            title: c.title,
            description: c.description,
            goal_amount: c.goal_amount,
            current_amount: c.current_amount,
            image_url: c.image_url,
            deadline: c.deadline,
            milestones: c.milestones,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// donation representation in api responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DonationResponse {
    pub id: u64,
    pub campaign_id: u64,
    pub donor_wallet: WalletAddress,
    pub amount: Amount,
    pub transaction_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Donation> for DonationResponse {
    fn from(d: Donation) -> Self {
        Self {
            id: d.id,
            campaign_id: d.campaign_id.0,
            donor_wallet: d.donor_wallet,
            amount: d.amount,
            transaction_hash: d.transaction_hash,
            created_at: d.created_at,
        }
    }
}

/// request body for creating a campaign.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateCampaignRequest {
    pub creator_wallet: WalletAddress,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub goal_amount: Amount,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    pub milestones: Vec<Milestone>,
}

/// request body for editing a campaign. milestones cannot be edited.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateCampaignRequest {
    /// the editing wallet; must be the creator.
    pub wallet: WalletAddress,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

/// query for destructive calls that need an acting wallet.
#[derive(Debug, Deserialize)]
pub(crate) struct ActorQuery {
    #[serde(default)]
    pub wallet: Option<String>,
}

/// request body for a donation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DonateRequest {
    pub donor_wallet: WalletAddress,
    pub amount: Amount,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

/// response payload for a donation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DonateResponse {
    pub donation: DonationResponse,
    pub current_amount: Amount,
}

/// create the campaigns router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_campaigns).post(create_campaign))
        .route(
            "/{id}",
            get(get_campaign).put(update_campaign).delete(delete_campaign),
        )
        .route("/{id}/donations", get(list_donations).post(donate))
}

fn validate_title(title: &str) -> Result<String, ApiError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::bad_request(format!(
            "title exceeds maximum length of {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

fn validate_image_url(image_url: Option<String>) -> Result<Option<String>, ApiError> {
    match image_url.map(|u| u.trim().to_string()) {
        None => Ok(None),
        Some(u) if u.is_empty() => Ok(None),
        Some(u) => {
            url::Url::parse(&u).map_err(|_| ApiError::bad_request("invalid imageUrl"))?;
            Ok(Some(u))
        }
    }
}

fn validate_deadline(deadline: Option<DateTime<Utc>>) -> Result<Option<DateTime<Utc>>, ApiError> {
    if let Some(deadline) = deadline
        && deadline <= Utc::now()
    {
        return Err(ApiError::bad_request("deadline must be in the future"));
    }
    Ok(deadline)
}

fn validate_milestones(goal_amount: Amount, milestones: &[Milestone]) -> Result<(), ApiError> {
    if !goal_amount.is_positive() {
        return Err(ApiError::bad_request("goalAmount must be positive"));
    }
    if milestones.is_empty() {
        return Err(ApiError::bad_request("at least one milestone is required"));
    }
    for (i, m) in milestones.iter().enumerate() {
        if m.title.trim().is_empty() {
            return Err(ApiError::bad_request(format!(
                "milestone {} is missing a title",
                i
            )));
        }
        if !m.target_amount.is_positive() {
            return Err(ApiError::bad_request(format!(
                "milestone {} targetAmount must be positive",
                i
            )));
        }
    }
    let total = Amount::checked_sum(milestones.iter().map(|m| m.target_amount))
        .ok_or_else(|| ApiError::bad_request("milestone targets are too large"))?;
    if total > goal_amount {
        return Err(ApiError::bad_request(format!(
            "milestone targets sum to {}, which exceeds goalAmount {}",
            total, goal_amount
        )));
    }
    Ok(())
}

async fn load_campaign(state: &AppState, id: u64) -> Result<Campaign, ApiError> {
    state
        .db
        .get_campaign(CampaignId(id))
        .await
        .map_internal()?
        .or_not_found("campaign not found")
}

/// `GET /api/campaigns`
async fn list_campaigns(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CampaignResponse>>>, ApiError> {
    let campaigns = state.db.list_campaigns().await.map_internal()?;
    Ok(ApiResponse::ok(
        campaigns.into_iter().map(CampaignResponse::from).collect(),
    ))
}

/// `POST /api/campaigns`
async fn create_campaign(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CampaignResponse>>), ApiError> {
    let title = validate_title(&req.title)?;
    validate_milestones(req.goal_amount, &req.milestones)?;
    let image_url = validate_image_url(req.image_url)?;
    let deadline = validate_deadline(req.deadline)?;

    let creator = state
        .db
        .get_user_by_wallet(&req.creator_wallet)
        .await
        .map_internal()?
        .or_not_found("creator not found")?;
    if !creator.is_verified {
        return Err(ApiError::forbidden(
            "creator must verify their email before creating campaigns",
        ));
    }

    let milestones = req
        .milestones
        .into_iter()
        .map(|m| Milestone {
            title: m.title.trim().to_string(),
            description: m.description,
            target_amount: m.target_amount,
        })
        .collect();
    let mut campaign = Campaign::new(
        req.creator_wallet,
        title,
        req.description,
        req.goal_amount,
        milestones,
    );
    campaign.image_url = image_url;
    campaign.deadline = deadline;

    let campaign = state.db.create_campaign(&campaign).await.map_internal()?;

    info!(
        campaign_id = %campaign.id,
        creator = %campaign.creator_wallet,
        milestones = campaign.milestones.len(),
        "campaign created"
    );
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("campaign created", CampaignResponse::from(campaign)),
    ))
}

/// `GET /api/campaigns/{id}`
async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ApiResponse<CampaignResponse>>, ApiError> {
    let campaign = load_campaign(&state, id).await?;
    Ok(ApiResponse::ok(CampaignResponse::from(campaign)))
}

/// `PUT /api/campaigns/{id}`
async fn update_campaign(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    JsonBody(req): JsonBody<UpdateCampaignRequest>,
) -> Result<Json<ApiResponse<CampaignResponse>>, ApiError> {
    let mut campaign = load_campaign(&state, id).await?;
    if campaign.creator_wallet != req.wallet {
        warn!(campaign_id = id, wallet = %req.wallet, "campaign edit by non-creator");
        return Err(ApiError::forbidden(
            "only the campaign creator can edit it",
        ));
    }

    if let Some(title) = req.title {
        campaign.title = validate_title(&title)?;
    }
    if let Some(description) = req.description {
        campaign.description = description;
    }
    if req.image_url.is_some() {
        campaign.image_url = validate_image_url(req.image_url)?;
    }
    if req.deadline.is_some() {
        campaign.deadline = validate_deadline(req.deadline)?;
    }

    let campaign = state.db.update_campaign(&campaign).await.map_internal()?;
    info!(campaign_id = id, "campaign updated");
    Ok(ApiResponse::with_message(
        "campaign updated",
        CampaignResponse::from(campaign),
    ))
}

/// `DELETE /api/campaigns/{id}?wallet=0x...`
///
/// only unfunded campaigns without approval records can be deleted.
async fn delete_campaign(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(actor): Query<ActorQuery>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let wallet = actor
        .wallet
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("wallet is required"))
        .and_then(|w| WalletAddress::new(w).map_err(|e| ApiError::bad_request(e.to_string())))?;

    let campaign = load_campaign(&state, id).await?;
    if campaign.creator_wallet != wallet {
        warn!(campaign_id = id, wallet = %wallet, "campaign delete by non-creator");
        return Err(ApiError::forbidden(
            "only the campaign creator can delete it",
        ));
    }

    // funding and approvals are checked by the delete itself
    let deleted = state
        .db
        .delete_unused_campaign(campaign.id)
        .await
        .map_err(|e| match e {
            chainfund_db::Error::NotFound(_) => ApiError::not_found("campaign not found"),
            other => ApiError::internal(other),
        })?;
    if !deleted {
        return Err(ApiError::conflict(
            "campaigns with donations or milestone approvals cannot be deleted",
        ));
    }

    info!(campaign_id = id, "campaign deleted");
    Ok(ApiResponse::message("campaign deleted"))
}

/// `GET /api/campaigns/{id}/donations`
async fn list_donations(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ApiResponse<Vec<DonationResponse>>>, ApiError> {
    let campaign = load_campaign(&state, id).await?;
    let donations = state.db.list_donations(campaign.id).await.map_internal()?;
    Ok(ApiResponse::ok(
        donations.into_iter().map(DonationResponse::from).collect(),
    ))
}

/// `POST /api/campaigns/{id}/donations`
async fn donate(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    JsonBody(req): JsonBody<DonateRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DonateResponse>>), ApiError> {
    if !req.amount.is_positive() {
        return Err(ApiError::bad_request("amount must be positive"));
    }

    let donation = Donation {
        id: 0,
        campaign_id: CampaignId(id),
        donor_wallet: req.donor_wallet,
        amount: req.amount,
        transaction_hash: req
            .transaction_hash
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty()),
        created_at: Utc::now(),
    };

    let (donation, campaign) = state.db.record_donation(&donation).await.map_err(|e| match e {
        chainfund_db::Error::NotFound(_) => ApiError::not_found("campaign not found"),
        other => ApiError::internal(other),
    })?;

    info!(
        campaign_id = id,
        donor = %donation.donor_wallet,
        amount = %donation.amount,
        total = %campaign.current_amount,
        "donation recorded"
    );
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(
            "donation recorded",
            DonateResponse {
                donation: DonationResponse::from(donation),
                current_amount: campaign.current_amount,
            },
        ),
    ))
}
