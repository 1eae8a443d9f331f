//! chainfund library - HTTP handlers and application setup.
//!
//! this crate provides the http server for the chainfund crowdfunding backend:
//! - [`handlers`]: http request handlers for the json api
//! - [`cli`]: command-line interface implementation
//! - [`mailer`]: delivery of signup passcodes

#![warn(missing_docs)]

/// command-line interface implementation.
pub mod cli;
/// http request handlers for the json api.
pub mod handlers;
/// delivery of signup passcodes.
pub mod mailer;

use std::sync::Arc;

use axum::{Router, routing::get};
use chainfund_approvals::{ApprovalEngine, chain};
use chainfund_db::ChainfundDb;
use chainfund_types::Config;

use crate::mailer::MailerBoxed;

/// shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    /// record store.
    pub db: ChainfundDb,
    /// milestone approval engine over the same store.
    pub engine: ApprovalEngine<ChainfundDb>,
    /// server configuration.
    pub config: Config,
    /// passcode delivery.
    pub mailer: Arc<dyn MailerBoxed>,
}

/// create the axum application with all routes.
///
/// the chain verifier is built from `config.chain`.
pub fn create_app(db: ChainfundDb, config: Config, mailer: Arc<dyn MailerBoxed>) -> Router {
    let engine = ApprovalEngine::new(db.clone()).with_chain(chain::from_config(&config.chain));

    let state = AppState {
        db,
        engine,
        config,
        mailer,
    };

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/auth", handlers::auth::router())
        .nest("/api/users", handlers::users::router())
        .nest("/api/campaigns", handlers::campaigns::router())
        .nest("/api/milestone-approval", handlers::approvals::router())
        .nest("/api/admin", handlers::admin::router())
        .with_state(state)
}
