//! public user profiles.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use chainfund_db::Database;
use chainfund_types::{User, UserRole, WalletAddress};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;
use crate::handlers::{ApiError, ApiResponse, OptionExt, ResultExt};

/// user representation in api responses. never carries passcode state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserResponse {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub wallet_address: WalletAddress,
    pub role: UserRole,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.0,
            name: user.name,
            email: user.email.into_inner(),
            wallet_address: user.wallet_address,
            role: user.role,
            is_verified: user.is_verified,
            created_at: user.created_at,
        }
    }
}

/// create the users router.
pub fn router() -> Router<AppState> {
    Router::new().route("/{wallet}", get(get_user))
}

/// `GET /api/users/{wallet}`
async fn get_user(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let wallet = WalletAddress::new(&wallet).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let user = state
        .db
        .get_user_by_wallet(&wallet)
        .await
        .map_internal()?
        .or_not_found("user not found")?;

    Ok(ApiResponse::ok(UserResponse::from(user)))
}
