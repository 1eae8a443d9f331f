//! integration tests for `/api/campaigns`

mod api_common;

use api_common::{ApiFixture, CREATOR, OUTSIDER, empty_request, json_request};
use axum::http::StatusCode;
use chainfund_db::Database;
use chainfund_types::{
    CampaignId,
    test_utils::{eth, test_wallet},
};
use serde_json::{Value, json};

fn create_body(goal: f64, targets: &[f64]) -> Value {
    let milestones: Vec<Value> = targets
        .iter()
        .enumerate()
        .map(|(i, t)| json!({"title": format!("phase {i}"), "targetAmount": t}))
        .collect();
    json!({
        "creatorWallet": test_wallet(CREATOR).as_str(),
        "title": "community well",
        "description": "clean water for the village",
        "goalAmount": goal,
        "milestones": milestones,
    })
}

fn donation(amount: f64) -> Value {
    json!({"donorWallet": test_wallet(OUTSIDER).as_str(), "amount": amount})
}

#[tokio::test]
async fn test_create_and_fetch_campaign() {
    let fixture = ApiFixture::new().await;

    let (status, body) = fixture
        .send(json_request(
            "POST",
            "/api/campaigns",
            create_body(10.0, &[3.0, 5.0, 2.0]),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_u64().unwrap();
    assert_eq!(body["data"]["currentAmount"], "0");
    assert_eq!(body["data"]["goalAmount"], "10");

    let (status, body) = fixture
        .send(empty_request("GET", &format!("/api/campaigns/{id}")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "community well");
    assert_eq!(body["data"]["milestones"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"]["milestones"][1]["targetAmount"], "5");
}

#[tokio::test]
async fn test_create_rejects_milestones_over_goal() {
    let fixture = ApiFixture::new().await;

    let (status, body) = fixture
        .send(json_request(
            "POST",
            "/api/campaigns",
            create_body(5.0, &[3.0, 5.0]),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_create_requires_verified_creator() {
    let fixture = ApiFixture::new().await;
    let mut creator = fixture.creator.clone();
    creator.is_verified = false;
    fixture.db.update_user(&creator).await.unwrap();

    let (status, _) = fixture
        .send(json_request(
            "POST",
            "/api/campaigns",
            create_body(10.0, &[10.0]),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_donations_increment_current_amount() {
    let fixture = ApiFixture::new().await;
    let campaign = fixture.seed_campaign(0.0).await;
    let uri = format!("/api/campaigns/{}/donations", campaign.id.0);

    let (status, body) = fixture.send(json_request("POST", &uri, donation(2.5))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["currentAmount"], "2.5");

    let (_, body) = fixture.send(json_request("POST", &uri, donation(4.0))).await;
    assert_eq!(body["data"]["currentAmount"], "6.5");

    let (status, body) = fixture.send(empty_request("GET", &uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let stored = fixture.db.get_campaign(campaign.id).await.unwrap().unwrap();
    assert_eq!(stored.current_amount, eth("6.5"));
}

#[tokio::test]
async fn test_fractional_amounts_reach_milestones_exactly() {
    let fixture = ApiFixture::new().await;

    let (status, body) = fixture
        .send(json_request(
            "POST",
            "/api/campaigns",
            create_body(0.3, &[0.1, 0.2]),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["data"]["id"].as_u64().unwrap();
    assert_eq!(body["data"]["goalAmount"], "0.3");

    let uri = format!("/api/campaigns/{id}/donations");
    let (status, body) = fixture.send(json_request("POST", &uri, donation(0.3))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["currentAmount"], "0.3");

    let (status, body) = fixture
        .send(json_request(
            "POST",
            "/api/milestone-approval/auto-verify",
            json!({"campaignId": id, "milestoneIndex": 1}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["eligible"], true, "{body}");
    assert_eq!(body["data"]["targetAmount"], "0.3");

    let record = fixture
        .db
        .find_open_approval(CampaignId(id), 1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.requested_amount, eth("0.3"));
}

#[tokio::test]
async fn test_amounts_accept_decimal_strings() {
    let fixture = ApiFixture::new().await;
    let campaign = fixture.seed_campaign(0.0).await;
    let uri = format!("/api/campaigns/{}/donations", campaign.id.0);

    let body = json!({"donorWallet": test_wallet(OUTSIDER).as_str(), "amount": "0.000000001"});
    let (status, body) = fixture.send(json_request("POST", &uri, body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["currentAmount"], "0.000000001");

    let too_precise =
        json!({"donorWallet": test_wallet(OUTSIDER).as_str(), "amount": "0.0000000001"});
    let (status, _) = fixture.send(json_request("POST", &uri, too_precise)).await;
    assert!(status.is_client_error(), "got {status}");
}

#[tokio::test]
async fn test_non_positive_donation_is_rejected() {
    let fixture = ApiFixture::new().await;
    let campaign = fixture.seed_campaign(0.0).await;
    let uri = format!("/api/campaigns/{}/donations", campaign.id.0);

    for amount in [0.0, -1.0] {
        let (status, _) = fixture.send(json_request("POST", &uri, donation(amount))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let stored = fixture.db.get_campaign(campaign.id).await.unwrap().unwrap();
    assert_eq!(stored.current_amount, eth("0"));
}

#[tokio::test]
async fn test_donation_to_missing_campaign_is_404() {
    let fixture = ApiFixture::new().await;
    let (status, _) = fixture
        .send(json_request("POST", "/api/campaigns/404/donations", donation(1.0)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_only_by_creator() {
    let fixture = ApiFixture::new().await;
    let campaign = fixture.seed_campaign(0.0).await;
    let uri = format!("/api/campaigns/{}", campaign.id.0);

    let (status, _) = fixture
        .send(json_request(
            "PUT",
            &uri,
            json!({"wallet": test_wallet(OUTSIDER).as_str(), "title": "hijacked"}),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = fixture
        .send(json_request(
            "PUT",
            &uri,
            json!({"wallet": test_wallet(CREATOR).as_str(), "title": "renamed"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "renamed");
    assert_eq!(body["data"]["milestones"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_delete_unfunded_campaign() {
    let fixture = ApiFixture::new().await;
    let campaign = fixture.seed_campaign(0.0).await;
    let uri = format!(
        "/api/campaigns/{}?wallet={}",
        campaign.id.0,
        test_wallet(CREATOR).as_str()
    );

    let (status, body) = fixture.send(empty_request("DELETE", &uri)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(fixture.db.get_campaign(campaign.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_funded_campaign_is_conflict() {
    let fixture = ApiFixture::new().await;
    let campaign = fixture.seed_campaign(1.0).await;
    let uri = format!(
        "/api/campaigns/{}?wallet={}",
        campaign.id.0,
        test_wallet(CREATOR).as_str()
    );

    let (status, _) = fixture.send(empty_request("DELETE", &uri)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let stored = fixture.db.get_campaign(campaign.id).await.unwrap().unwrap();
    assert_eq!(stored.current_amount, eth("1"));
}

#[tokio::test]
async fn test_delete_campaign_with_approvals_is_conflict() {
    let fixture = ApiFixture::new().await;
    let campaign = fixture.seed_campaign(3.0).await;
    fixture
        .send(json_request(
            "POST",
            "/api/milestone-approval/auto-verify",
            json!({"campaignId": campaign.id.0, "milestoneIndex": 0}),
        ))
        .await;
    let uri = format!(
        "/api/campaigns/{}?wallet={}",
        campaign.id.0,
        test_wallet(CREATOR).as_str()
    );

    let (status, _) = fixture.send(empty_request("DELETE", &uri)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(fixture.db.get_campaign(campaign.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_by_outsider_is_forbidden() {
    let fixture = ApiFixture::new().await;
    let campaign = fixture.seed_campaign(0.0).await;
    let uri = format!(
        "/api/campaigns/{}?wallet={}",
        campaign.id.0,
        test_wallet(OUTSIDER).as_str()
    );

    let (status, _) = fixture.send(empty_request("DELETE", &uri)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_campaign_is_404() {
    let fixture = ApiFixture::new().await;
    let (status, body) = fixture
        .send(empty_request("GET", &format!("/api/campaigns/{}", CampaignId(42).0)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}
