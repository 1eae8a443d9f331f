//! webhook chain verifier.
//!
//! POSTs release requests as JSON to a relay that submits the transaction and
//! answers with `{"transactionHash": "0x..."}`. optionally signs requests
//! with HMAC-SHA256. every call is bounded by the configured timeout.

use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{ChainError, ChainRequest, ChainVerifier};

/// chain verifier backed by an http relay.
pub struct WebhookChainVerifier {
    client: Client,
    url: String,
    secret: Option<SecretString>,
    timeout: Duration,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelayResponse {
    transaction_hash: String,
}

impl WebhookChainVerifier {
    /// create a verifier posting to `url`, waiting at most `timeout` per call.
    pub fn new(url: String, secret: Option<SecretString>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            url,
            secret,
            timeout,
        }
    }

    fn http_error(&self, err: reqwest::Error) -> ChainError {
        if err.is_timeout() {
            ChainError::Timeout(self.timeout)
        } else {
            ChainError::Http(err)
        }
    }

    /// compute HMAC-SHA256 signature of the request body
    fn sign(&self, body: &[u8]) -> Option<String> {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        let secret = self.secret.as_ref()?;
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes()).ok()?;
        mac.update(body);
        let result = mac.finalize();
        Some(hex::encode(result.into_bytes()))
    }
}

impl ChainVerifier for WebhookChainVerifier {
    async fn verify_milestone(&self, request: ChainRequest) -> Result<String, ChainError> {
        let body = serde_json::to_vec(&request)
            .map_err(|e| ChainError::Relay(format!("encode request: {e}")))?;

        let mut req = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .body(body.clone());
        if let Some(sig) = self.sign(&body) {
            req = req.header("X-Signature", sig);
        }

        let resp = req.send().await.map_err(|e| self.http_error(e))?;

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ChainError::Relay(format!("webhook: {text}")));
        }

        let parsed: RelayResponse = resp.json().await.map_err(|e| self.http_error(e))?;
        if parsed.transaction_hash.trim().is_empty() {
            return Err(ChainError::Relay("webhook: empty transaction hash".into()));
        }
        Ok(parsed.transaction_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainfund_types::{Amount, ApprovalId, CampaignId, WalletAddress};
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn webhook_verifier(url: String, secret: Option<SecretString>) -> WebhookChainVerifier {
        WebhookChainVerifier::new(url, secret, TIMEOUT)
    }

    fn request() -> ChainRequest {
        ChainRequest {
            approval_id: ApprovalId(1),
            campaign_id: CampaignId(7),
            milestone_index: 0,
            creator_wallet: WalletAddress::new("0x00000000000000000000000000000000000000aa")
                .unwrap(),
            amount: Amount::parse("0.3").unwrap(),
        }
    }

    #[test]
    fn sign_produces_hex_hmac() {
        let verifier = webhook_verifier(
            "https://example.com/release".to_string(),
            Some(SecretString::from("test-secret")),
        );
        let sig = verifier.sign(b"hello");
        // hmac-sha256 output is 64 hex chars
        assert_eq!(sig.unwrap().len(), 64);
    }

    #[test]
    fn sign_returns_none_without_secret() {
        let verifier = webhook_verifier("https://example.com/release".to_string(), None);
        assert!(verifier.sign(b"hello").is_none());
    }

    #[tokio::test]
    async fn verify_posts_request_and_returns_hash() {
        let mock_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/"))
            .and(matchers::body_json(serde_json::json!({
                "approvalId": 1,
                "campaignId": 7,
                "milestoneIndex": 0,
                "creatorWallet": "0x00000000000000000000000000000000000000aa",
                "amount": "0.3",
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"transactionHash": "0xfeed"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let verifier = webhook_verifier(mock_server.uri(), None);
        let hash = ChainVerifier::verify_milestone(&verifier, request())
            .await
            .unwrap();
        assert_eq!(hash, "0xfeed");
    }

    #[tokio::test]
    async fn verify_includes_signature_header() {
        let mock_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::header_exists("X-Signature"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"transactionHash": "0x01"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let verifier = webhook_verifier(mock_server.uri(), Some(SecretString::from("my-secret")));
        ChainVerifier::verify_milestone(&verifier, request())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn verify_returns_error_on_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("node unreachable"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let verifier = webhook_verifier(mock_server.uri(), None);
        let err = ChainVerifier::verify_milestone(&verifier, request())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("webhook: node unreachable"));
    }

    #[tokio::test]
    async fn verify_rejects_response_without_hash() {
        let mock_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&mock_server)
            .await;

        let verifier = webhook_verifier(mock_server.uri(), None);
        assert!(
            ChainVerifier::verify_milestone(&verifier, request())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn verify_gives_up_after_timeout() {
        let mock_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"transactionHash": "0xlate"}))
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&mock_server)
            .await;

        let verifier =
            WebhookChainVerifier::new(mock_server.uri(), None, Duration::from_millis(200));
        let started = std::time::Instant::now();
        let err = ChainVerifier::verify_milestone(&verifier, request())
            .await
            .unwrap_err();

        assert!(matches!(err, ChainError::Timeout(_)), "got {err:?}");
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
