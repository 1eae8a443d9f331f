//! health check endpoint handler

use std::time::Duration;

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chainfund_db::Database;
use serde::Serialize;
use tokio::time::timeout;

use crate::AppState;

/// health check response body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

/// content-type for health check responses per RFC 8040
const HEALTH_CONTENT_TYPE: &str = "application/health+json; charset=utf-8";

/// timeout for database ping
const PING_TIMEOUT: Duration = Duration::from_secs(1);

/// `GET /health`
///
/// returns 200 with `{"status": "pass"}` if the database answers a ping
/// within a second, 500 with `{"status": "fail"}` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let ping_result = timeout(PING_TIMEOUT, state.db.ping()).await;

    let (status_code, health_status) = match ping_result {
        Ok(Ok(())) => (StatusCode::OK, "pass"),
        Ok(Err(_)) | Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "fail"),
    };

    (
        status_code,
        [(header::CONTENT_TYPE, HEALTH_CONTENT_TYPE)],
        Json(HealthResponse {
            status: health_status,
        }),
    )
        .into_response()
}
