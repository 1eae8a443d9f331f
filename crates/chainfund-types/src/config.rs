//! configuration types for chainfund

use secrecy::SecretString;
use serde::Deserialize;

/// main configuration for chainfund.
///
/// every section has defaults, so a config file only needs the keys it changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// address to bind the http server to.
    pub listen_addr: String,

    /// database configuration.
    pub database: DatabaseConfig,

    /// signup passcode settings.
    pub otp: OtpConfig,

    /// how passcode emails are delivered.
    pub mailer: MailerConfig,

    /// how approved milestones are submitted on-chain.
    pub chain: ChainConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            database: DatabaseConfig::default(),
            otp: OtpConfig::default(),
            mailer: MailerConfig::default(),
            chain: ChainConfig::default(),
        }
    }
}

/// database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// database type: "sqlite" or "postgres".
    pub db_type: String,

    /// database connection string or file path.
    pub connection_string: String,

    /// sqlite-specific options.
    pub sqlite: SqliteConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: "sqlite".to_string(),
            connection_string: "/var/lib/chainfund/db.sqlite".to_string(),
            sqlite: SqliteConfig::default(),
        }
    }
}

/// sqlite-specific options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// enable write-ahead logging.
    pub write_ahead_log: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            write_ahead_log: true,
        }
    }
}

/// signup passcode settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OtpConfig {
    /// how long an emailed passcode stays valid, in seconds.
    pub expiry_secs: u64,

    /// wrong guesses allowed before the passcode is discarded.
    pub max_attempts: u32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            expiry_secs: 600, // 10 minutes
            max_attempts: 5,
        }
    }
}

/// default relay timeout for webhook collaborators.
pub const DEFAULT_RELAY_TIMEOUT_SECS: u64 = 10;

fn default_relay_timeout_secs() -> u64 {
    DEFAULT_RELAY_TIMEOUT_SECS
}

/// passcode email delivery.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MailerConfig {
    /// write messages to the log instead of sending them (development).
    #[default]
    Log,
    /// POST messages as json to a mail relay.
    Webhook {
        /// relay endpoint.
        url: String,
        /// optional hmac-sha256 signing secret.
        #[serde(default)]
        secret: Option<SecretString>,
        /// seconds to wait for the relay before giving up.
        #[serde(default = "default_relay_timeout_secs")]
        timeout_secs: u64,
    },
}

/// on-chain verification after a milestone is approved.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainConfig {
    /// no chain relay configured; approvals are recorded off-chain only.
    #[default]
    Disabled,
    /// POST verification requests to a relay that submits the transaction.
    Webhook {
        /// relay endpoint.
        url: String,
        /// optional hmac-sha256 signing secret.
        #[serde(default)]
        secret: Option<SecretString>,
        /// seconds to wait for the relay before giving up.
        #[serde(default = "default_relay_timeout_secs")]
        timeout_secs: u64,
    },
}
