//! shared helpers for http api tests

#![allow(dead_code)] // not every helper is used by every test file

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use chainfund::{create_app, mailer::LogMailer};
use chainfund_db::{ChainfundDb, Database};
use chainfund_types::{
    Campaign, Config, User,
    test_utils::{TestCampaignBuilder, TestUserBuilder},
};
use serde_json::Value;
use tower::ServiceExt;

/// wallet seed of the seeded campaign creator
pub const CREATOR: u8 = 1;
/// wallet seed of the seeded admin
pub const ADMIN: u8 = 2;
/// wallet seed of the seeded regular user
pub const OUTSIDER: u8 = 3;

/// database, app and seeded accounts shared by api tests
pub struct ApiFixture {
    pub db: ChainfundDb,
    pub app: Router,
    pub creator: User,
    pub admin: User,
    pub outsider: User,
}

impl ApiFixture {
    /// fixture with the default config and a logging mailer
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    /// fixture with a custom config
    pub async fn with_config(config: Config) -> Self {
        let db = ChainfundDb::new_in_memory()
            .await
            .expect("failed to create in-memory database");

        let creator = db
            .create_user(&TestUserBuilder::new(CREATOR).with_name("creator").build())
            .await
            .unwrap();
        let admin = db
            .create_user(&TestUserBuilder::new(ADMIN).with_name("admin").admin().build())
            .await
            .unwrap();
        let outsider = db
            .create_user(&TestUserBuilder::new(OUTSIDER).with_name("outsider").build())
            .await
            .unwrap();

        let app = create_app(db.clone(), config, Arc::new(LogMailer));
        Self {
            db,
            app,
            creator,
            admin,
            outsider,
        }
    }

    /// insert the 3/5/2 campaign owned by the creator with `raised` funds
    pub async fn seed_campaign(&self, raised: f64) -> Campaign {
        let campaign = TestCampaignBuilder::new()
            .with_milestone_targets(&[3.0, 5.0, 2.0])
            .with_current_amount(raised)
            .build();
        self.db.create_campaign(&campaign).await.unwrap()
    }

    /// send a request and return status plus parsed json body
    pub async fn send(&self, request: Request<Body>) -> (axum::http::StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        read_json(response).await
    }
}

/// build a json request
pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// build a bodiless request
pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// split a response into status and json body
pub async fn read_json(response: Response<Body>) -> (axum::http::StatusCode, Value) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("response body should be json")
    };
    (status, value)
}
