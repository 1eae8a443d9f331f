//! webhook mail relay.
//!
//! POSTs `{to, name, code, expiresInMinutes, subject, text}` as JSON to a
//! user-configured URL. optionally signs requests with HMAC-SHA256.

use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use super::{Mailer, MailerError, OtpMessage};

/// mailer backed by an http relay.
pub struct WebhookMailer {
    client: Client,
    url: String,
    secret: Option<SecretString>,
    timeout: Duration,
}

impl WebhookMailer {
    /// create a mailer posting to `url`, waiting at most `timeout` per message.
    pub fn new(url: String, secret: Option<SecretString>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            url,
            secret,
            timeout,
        }
    }

    /// compute HMAC-SHA256 signature of the request body
    fn sign(&self, body: &[u8]) -> Option<String> {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        let secret = self.secret.as_ref()?;
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes()).ok()?;
        mac.update(body);
        Some(hex::encode(mac.finalize().into_bytes()))
    }
}

impl Mailer for WebhookMailer {
    async fn send_otp(&self, message: OtpMessage) -> Result<(), MailerError> {
        let payload = serde_json::json!({
            "to": message.to,
            "name": message.name,
            "code": message.code,
            "expiresInMinutes": message.expires_in_minutes,
            "subject": message.subject(),
            "text": message.text(),
        });
        let body = payload.to_string().into_bytes();

        let mut req = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .body(body.clone());
        if let Some(sig) = self.sign(&body) {
            req = req.header("X-Signature", sig);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                MailerError::Timeout(self.timeout)
            } else {
                MailerError::Http(e)
            }
        })?;

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(MailerError::Relay(format!("webhook: {text}")));
        }

        Ok(())
    }
}
