//! on-chain verification of approved milestones.
//!
//! after an admin approves a milestone the engine asks a chain verifier to
//! submit the release on-chain and keeps the returned transaction hash.

mod webhook;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chainfund_types::{Amount, ApprovalId, CampaignId, ChainConfig, WalletAddress};
use serde::Serialize;

pub use webhook::WebhookChainVerifier;

/// errors from chain verification.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
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

/// what the verifier is asked to put on-chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainRequest {
    /// the approved record.
    pub approval_id: ApprovalId,
    /// campaign the milestone belongs to.
    pub campaign_id: CampaignId,
    /// zero-based milestone position.
    pub milestone_index: u32,
    /// wallet receiving the released funds.
    pub creator_wallet: WalletAddress,
    /// amount released.
    pub amount: Amount,
}

/// trait for services that record a milestone release on-chain.
///
/// takes an owned request to avoid lifetime issues with dynamic dispatch.
pub trait ChainVerifier: Send + Sync {
    /// submit the release, returning the transaction hash.
    fn verify_milestone(
        &self,
        request: ChainRequest,
    ) -> impl Future<Output = Result<String, ChainError>> + Send;
}

/// object-safe wrapper for ChainVerifier, used for dynamic dispatch
pub trait ChainVerifierBoxed: Send + Sync {
    /// submit the release
    fn verify_milestone(
        &self,
        request: ChainRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, ChainError>> + Send + '_>>;
}

impl<T: ChainVerifier> ChainVerifierBoxed for T {
    fn verify_milestone(
        &self,
        request: ChainRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, ChainError>> + Send + '_>> {
        Box::pin(ChainVerifier::verify_milestone(self, request))
    }
}

/// construct a chain verifier from config.
///
/// returns `None` when no relay is configured.
pub fn from_config(config: &ChainConfig) -> Option<Arc<dyn ChainVerifierBoxed>> {
    match config {
        ChainConfig::Disabled => None,
        ChainConfig::Webhook {
            url,
            secret,
            timeout_secs,
        } => Some(Arc::new(WebhookChainVerifier::new(
            url.clone(),
            secret.clone(),
            Duration::from_secs(*timeout_secs),
        ))),
    }
}
