//! http handlers for the chainfund json api.
//!
//! every json response carries a `success` flag; failures are
//! `{"success": false, "message": "..."}` (see [`ApiError`]).

pub mod admin;
pub mod approvals;
pub mod auth;
pub mod campaigns;
mod error;
mod health;
pub mod users;

pub use error::{ApiError, JsonBody, OptionExt, ResultExt};
pub use health::health;

use axum::Json;
use serde::Serialize;

/// success envelope for api responses.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// always true; failures go through [`ApiError`].
    pub success: bool,
    /// human-readable summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// wrap a payload.
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            data: Some(data),
        })
    }

    /// wrap a payload with a message.
    pub fn with_message(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        })
    }
}

impl ApiResponse<()> {
    /// a message without payload.
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: None,
        })
    }
}
