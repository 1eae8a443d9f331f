//! passcode delivery for signup verification.
//!
//! supports logging codes (development) and a generic webhook mail relay.

mod webhook;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chainfund_types::MailerConfig;
use serde::Serialize;
use tracing::info;

pub use webhook::WebhookMailer;

/// errors from mail delivery.
#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    /// http request failed
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// relay did not answer in time
    #[error("relay timed out after {0:?}")]
    Timeout(Duration),
    /// relay returned an error response
    #[error("relay error: {0}")]
    Relay(String),
}

/// a passcode email.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpMessage {
    /// recipient address.
    pub to: String,
    /// recipient display name.
    pub name: String,
    /// the six-digit code.
    pub code: String,
    /// minutes until the code expires.
    pub expires_in_minutes: u64,
}

impl OtpMessage {
    /// subject line.
    pub fn subject(&self) -> &'static str {
        "Your chainfund verification code"
    }

    /// plain-text body.
    pub fn text(&self) -> String {
        format!(
            "Hi {},\n\nYour verification code is {}. It expires in {} minutes.\n",
            self.name, self.code, self.expires_in_minutes
        )
    }
}

/// trait for services that deliver passcode emails.
///
/// takes an owned message to avoid lifetime issues with dynamic dispatch.
pub trait Mailer: Send + Sync {
    /// deliver a passcode.
    fn send_otp(&self, message: OtpMessage)
    -> impl Future<Output = Result<(), MailerError>> + Send;
}

/// object-safe wrapper for Mailer, used for dynamic dispatch
pub trait MailerBoxed: Send + Sync {
    /// deliver a passcode
    fn send_otp(
        &self,
        message: OtpMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), MailerError>> + Send + '_>>;
}

impl<T: Mailer> MailerBoxed for T {
    fn send_otp(
        &self,
        message: OtpMessage,
    ) -> Pin<Box<dyn Future<Output = Result<(), MailerError>> + Send + '_>> {
        Box::pin(Mailer::send_otp(self, message))
    }
}

/// writes passcodes to the log instead of sending them.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

impl Mailer for LogMailer {
    async fn send_otp(&self, message: OtpMessage) -> Result<(), MailerError> {
        info!(
            to = %message.to,
            code = %message.code,
            expires_in_minutes = message.expires_in_minutes,
            "otp email (log mailer)"
        );
        Ok(())
    }
}

/// construct a boxed mailer from config.
pub fn from_config(config: &MailerConfig) -> Arc<dyn MailerBoxed> {
    match config {
        MailerConfig::Log => Arc::new(LogMailer),
        MailerConfig::Webhook {
            url,
            secret,
            timeout_secs,
        } => Arc::new(WebhookMailer::new(
            url.clone(),
            secret.clone(),
            Duration::from_secs(*timeout_secs),
        )),
    }
}
