//! signup and email verification endpoints.
//!
//! signup creates an unverified account and emails a six-digit passcode.
//! only the passcode's sha-256 hash is stored.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use chainfund_db::Database;
use chainfund_types::{Email, OtpCode, User, WalletAddress};
use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::AppState;
use crate::handlers::users::UserResponse;
use crate::handlers::{ApiError, ApiResponse, JsonBody, OptionExt, ResultExt};
use crate::mailer::OtpMessage;

/// maximum length for a display name (characters).
const MAX_NAME_LEN: usize = 100;

/// request body for signup.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignupRequest {
    pub name: String,
    pub email: String,
    pub wallet_address: String,
}

/// request body for passcode verification.
#[derive(Debug, Deserialize)]
pub(crate) struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

/// request body for passcode resend.
#[derive(Debug, Deserialize)]
pub(crate) struct ResendOtpRequest {
    pub email: String,
}

/// create the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/verify-otp", post(verify_otp))
        .route("/resend-otp", post(resend_otp))
}

fn parse_email(raw: &str) -> Result<Email, ApiError> {
    Email::new(raw).map_err(|e| ApiError::bad_request(e.to_string()))
}

/// generate a fresh passcode for `user`, replacing any outstanding one.
fn issue_otp(state: &AppState, user: &mut User) -> OtpCode {
    let code = OtpCode::generate();
    user.otp_hash = Some(code.hash());
    user.otp_attempts = 0;
    user.otp_expires_at =
        Some(Utc::now() + Duration::seconds(state.config.otp.expiry_secs as i64));
    code
}

async fn send_otp(state: &AppState, user: &User, code: &OtpCode) -> Result<(), ApiError> {
    let message = OtpMessage {
        to: user.email.as_str().to_string(),
        name: user.name.clone(),
        code: code.as_str().to_string(),
        expires_in_minutes: state.config.otp.expiry_secs.div_ceil(60),
    };
    state.mailer.send_otp(message).await.map_err(|e| {
        warn!(user_id = user.id.0, error = %e, "failed to send otp email");
        ApiError::internal("failed to send verification email")
    })
}

async fn find_unverified(state: &AppState, email: &Email) -> Result<User, ApiError> {
    let user = state
        .db
        .get_user_by_email(email.as_str())
        .await
        .map_internal()?
        .or_not_found("user not found")?;
    if user.is_verified {
        return Err(ApiError::conflict("user is already verified"));
    }
    Ok(user)
}

/// `POST /api/auth/signup`
async fn signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "name exceeds maximum length of {} characters",
            MAX_NAME_LEN
        )));
    }
    let email = parse_email(&req.email)?;
    let wallet = WalletAddress::new(req.wallet_address.trim())
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    if state
        .db
        .get_user_by_email(email.as_str())
        .await
        .map_internal()?
        .is_some()
    {
        return Err(ApiError::conflict("email is already registered"));
    }
    if state
        .db
        .get_user_by_wallet(&wallet)
        .await
        .map_internal()?
        .is_some()
    {
        return Err(ApiError::conflict("wallet is already registered"));
    }

    let mut user = User::new(name, email, wallet);
    let code = issue_otp(&state, &mut user);

    let user = state.db.create_user(&user).await.map_err(|e| match e {
        chainfund_db::Error::AlreadyExists(_) => {
            ApiError::conflict("email or wallet is already registered")
        }
        other => ApiError::internal(other),
    })?;

    send_otp(&state, &user, &code).await?;

    info!(user_id = user.id.0, wallet = %user.wallet_address, "user signed up");
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(
            "signup successful, check your email for the verification code",
            UserResponse::from(user),
        ),
    ))
}

/// `POST /api/auth/verify-otp`
async fn verify_otp(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<VerifyOtpRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let email = parse_email(&req.email)?;
    let mut user = find_unverified(&state, &email).await?;

    if !user.has_live_otp(Utc::now()) {
        return Err(ApiError::bad_request("otp expired, request a new one"));
    }
    // every guess is counted before it is checked
    let max_attempts = state.config.otp.max_attempts;
    if !state
        .db
        .claim_otp_attempt(user.id, max_attempts)
        .await
        .map_internal()?
    {
        warn!(user_id = user.id.0, max_attempts, "otp attempts exhausted");
        return Err(ApiError::bad_request(
            "too many failed attempts, request a new code",
        ));
    }
    let Some(stored_hash) = user.otp_hash.as_deref() else {
        return Err(ApiError::bad_request("otp expired, request a new one"));
    };
    let matches = OtpCode::parse(req.otp.trim()).is_some_and(|code| code.verify_hash(stored_hash));
    if !matches {
        warn!(user_id = user.id.0, "invalid otp submitted");
        return Err(ApiError::bad_request("invalid otp"));
    }

    user.is_verified = true;
    user.otp_hash = None;
    user.otp_expires_at = None;
    user.otp_attempts = 0;
    let user = state.db.update_user(&user).await.map_internal()?;

    info!(user_id = user.id.0, "email verified");
    Ok(ApiResponse::with_message(
        "email verified",
        UserResponse::from(user),
    ))
}

/// `POST /api/auth/resend-otp`
async fn resend_otp(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ResendOtpRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let email = parse_email(&req.email)?;
    let mut user = find_unverified(&state, &email).await?;

    let code = issue_otp(&state, &mut user);
    let user = state.db.update_user(&user).await.map_internal()?;
    send_otp(&state, &user, &code).await?;

    info!(user_id = user.id.0, "otp reissued");
    Ok(ApiResponse::message("a new verification code has been sent"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chainfund_db::ChainfundDb;
    use chainfund_types::Config;
    use chainfund_types::test_utils::test_wallet;
    use tower::ServiceExt;

    use super::*;
    use crate::create_app;
    use crate::mailer::LogMailer;

    async fn setup() -> (ChainfundDb, Router) {
        setup_with(Config::default()).await
    }

    async fn setup_with(config: Config) -> (ChainfundDb, Router) {
        let db = ChainfundDb::new_in_memory().await.unwrap();
        let app = create_app(db.clone(), config, Arc::new(LogMailer));
        (db, app)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn seed_user_with_code(db: &ChainfundDb, code: &str, expires_in: Duration) -> User {
        let mut user = User::new(
            "ada".to_string(),
            Email::new("ada@example.com").unwrap(),
            test_wallet(3),
        );
        let code = OtpCode::parse(code).unwrap();
        user.otp_hash = Some(code.hash());
        user.otp_expires_at = Some(Utc::now() + expires_in);
        db.create_user(&user).await.unwrap()
    }

    #[tokio::test]
    async fn test_signup_creates_unverified_user_with_otp() {
        let (db, app) = setup().await;

        let response = app
            .oneshot(post_json(
                "/api/auth/signup",
                serde_json::json!({
                    "name": "ada",
                    "email": "Ada@Example.com",
                    "walletAddress": test_wallet(3).as_str(),
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let stored = db.get_user_by_wallet(&test_wallet(3)).await.unwrap().unwrap();
        assert!(!stored.is_verified);
        assert_eq!(stored.email.as_str(), "ada@example.com");
        assert!(stored.has_live_otp(Utc::now()));
    }

    #[tokio::test]
    async fn test_signup_rejects_invalid_wallet() {
        let (_db, app) = setup().await;

        let response = app
            .oneshot(post_json(
                "/api/auth/signup",
                serde_json::json!({
                    "name": "ada",
                    "email": "ada@example.com",
                    "walletAddress": "0x1234",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_verify_otp_accepts_correct_code_once() {
        let (db, app) = setup().await;
        seed_user_with_code(&db, "482913", Duration::minutes(5)).await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/auth/verify-otp",
                serde_json::json!({"email": "ada@example.com", "otp": "482913"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let stored = db.get_user_by_wallet(&test_wallet(3)).await.unwrap().unwrap();
        assert!(stored.is_verified);
        assert!(stored.otp_hash.is_none());

        let again = app
            .oneshot(post_json(
                "/api/auth/verify-otp",
                serde_json::json!({"email": "ada@example.com", "otp": "482913"}),
            ))
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_verify_otp_rejects_wrong_code() {
        let (db, app) = setup().await;
        seed_user_with_code(&db, "482913", Duration::minutes(5)).await;

        let response = app
            .oneshot(post_json(
                "/api/auth/verify-otp",
                serde_json::json!({"email": "ada@example.com", "otp": "111111"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let stored = db.get_user_by_wallet(&test_wallet(3)).await.unwrap().unwrap();
        assert!(!stored.is_verified);
    }

    #[tokio::test]
    async fn test_verify_otp_locks_out_after_max_attempts() {
        let mut config = Config::default();
        config.otp.max_attempts = 3;
        let (db, app) = setup_with(config).await;
        seed_user_with_code(&db, "482913", Duration::minutes(5)).await;

        for wrong in ["111111", "222222", "333333"] {
            let response = app
                .clone()
                .oneshot(post_json(
                    "/api/auth/verify-otp",
                    serde_json::json!({"email": "ada@example.com", "otp": wrong}),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        // the right code no longer helps once the guesses are spent
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/auth/verify-otp",
                serde_json::json!({"email": "ada@example.com", "otp": "482913"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let stored = db.get_user_by_wallet(&test_wallet(3)).await.unwrap().unwrap();
        assert!(!stored.is_verified);
        assert_eq!(stored.otp_attempts, 3);

        // a fresh code restores the allowance
        let response = app
            .oneshot(post_json(
                "/api/auth/resend-otp",
                serde_json::json!({"email": "ada@example.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let stored = db.get_user_by_wallet(&test_wallet(3)).await.unwrap().unwrap();
        assert_eq!(stored.otp_attempts, 0);
    }

    #[tokio::test]
    async fn test_verify_otp_succeeds_on_last_allowed_attempt() {
        let mut config = Config::default();
        config.otp.max_attempts = 2;
        let (db, app) = setup_with(config).await;
        seed_user_with_code(&db, "482913", Duration::minutes(5)).await;

        let wrong = app
            .clone()
            .oneshot(post_json(
                "/api/auth/verify-otp",
                serde_json::json!({"email": "ada@example.com", "otp": "000000"}),
            ))
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::BAD_REQUEST);

        let right = app
            .oneshot(post_json(
                "/api/auth/verify-otp",
                serde_json::json!({"email": "ada@example.com", "otp": "482913"}),
            ))
            .await
            .unwrap();
        assert_eq!(right.status(), StatusCode::OK);
        let stored = db.get_user_by_wallet(&test_wallet(3)).await.unwrap().unwrap();
        assert!(stored.is_verified);
        assert_eq!(stored.otp_attempts, 0);
    }

    #[tokio::test]
    async fn test_verify_otp_rejects_expired_code() {
        let (db, app) = setup().await;
        seed_user_with_code(&db, "482913", Duration::minutes(-1)).await;

        let response = app
            .oneshot(post_json(
                "/api/auth/verify-otp",
                serde_json::json!({"email": "ada@example.com", "otp": "482913"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_resend_otp_replaces_code() {
        let (db, app) = setup().await;
        let before = seed_user_with_code(&db, "482913", Duration::minutes(5)).await;

        let response = app
            .oneshot(post_json(
                "/api/auth/resend-otp",
                serde_json::json!({"email": "ada@example.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let after = db.get_user_by_wallet(&test_wallet(3)).await.unwrap().unwrap();
        assert_ne!(after.otp_hash, before.otp_hash);
        assert!(after.has_live_otp(Utc::now()));
    }

    #[tokio::test]
    async fn test_resend_otp_unknown_email() {
        let (_db, app) = setup().await;

        let response = app
            .oneshot(post_json(
                "/api/auth/resend-otp",
                serde_json::json!({"email": "nobody@example.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
