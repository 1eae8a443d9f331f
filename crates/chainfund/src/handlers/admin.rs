//! admin review queue.

use axum::{Json, Router, extract::State, routing::get};
use chainfund_approvals::ApprovalStats;
use serde::Serialize;
use tracing::debug;

use crate::AppState;
use crate::handlers::ApiError;
use crate::handlers::approvals::ApprovalResponse;

/// response for the pending approvals listing.
#[derive(Debug, Serialize)]
pub(crate) struct PendingApprovalsResponse {
    pub success: bool,
    pub approvals: Vec<ApprovalResponse>,
    pub stats: ApprovalStats,
}

/// create the admin router.
pub fn router() -> Router<AppState> {
    Router::new().route("/approvals", get(list_pending))
}

/// `GET /api/admin/approvals`
///
/// pending records newest first, with counts per status and the mean
/// decision time in hours.
async fn list_pending(
    State(state): State<AppState>,
) -> Result<Json<PendingApprovalsResponse>, ApiError> {
    let queue = state.engine.list_pending_with_stats().await?;
    debug!(count = queue.approvals.len(), "listing pending approvals");

    Ok(Json(PendingApprovalsResponse {
        success: true,
        approvals: queue
            .approvals
            .into_iter()
            .map(ApprovalResponse::from)
            .collect(),
        stats: queue.stats,
    }))
}
