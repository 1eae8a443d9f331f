//! api error handling for http handlers

use axum::{
    Json,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use tracing::error;

/// api error type for handler responses
#[derive(Debug)]
pub enum ApiError {
    /// bad request error (400)
    BadRequest(String),
    /// forbidden error (403)
    Forbidden(String),
    /// not found error (404)
    NotFound(String),
    /// conflict error (409)
    Conflict(String),
    /// internal server error (500)
    Internal(String),
}

impl ApiError {
    /// create internal server error from any error type
    pub fn internal(e: impl std::fmt::Display) -> Self {
        Self::Internal(e.to_string())
    }

    /// create bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// create forbidden error
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// create not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// create conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => {
                error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        let body = serde_json::json!({
            "success": false,
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}

impl From<chainfund_approvals::Error> for ApiError {
    fn from(err: chainfund_approvals::Error) -> Self {
        use chainfund_approvals::Error;
        match err {
            Error::Validation(msg) => ApiError::BadRequest(msg),
            Error::Authorization(msg) => ApiError::Forbidden(msg),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::Dependency(msg) => ApiError::Internal(msg),
        }
    }
}

/// extension trait for converting results to apierror
pub trait ResultExt<T> {
    /// convert error to internal server error
    fn map_internal(self) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn map_internal(self) -> Result<T, ApiError> {
        self.map_err(ApiError::internal)
    }
}

/// extension trait for converting options to apierror
pub trait OptionExt<T> {
    /// convert none to not found error
    fn or_not_found(self, msg: &str) -> Result<T, ApiError>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, msg: &str) -> Result<T, ApiError> {
        self.ok_or_else(|| ApiError::not_found(msg))
    }
}

/// json body extractor whose rejections use the api error envelope.
///
/// malformed or mistyped bodies become 400 instead of axum's plain-text 4xx.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}
