//! the `serve` subcommand - runs the http server.

use std::net::SocketAddr;
use std::path::PathBuf;

use chainfund_db::ChainfundDb;
use chainfund_types::{Config, DatabaseConfig};
use clap::Args;
use color_eyre::eyre::{Context, Result, bail};
use tokio::net::TcpListener;
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

use crate::{create_app, mailer};

/// default config file search paths (in order of priority).
const CONFIG_SEARCH_PATHS: &[&str] = &[
    "/etc/chainfund/config.toml",
    "~/.config/chainfund/config.toml",
    "./config.toml",
];

/// run the chainfund http server
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// path to config file (toml format)
    #[arg(short, long, env = "CHAINFUND_CONFIG")]
    config: Option<PathBuf>,

    /// database url (sqlite:// or postgres://)
    #[arg(long, env = "CHAINFUND_DATABASE_URL")]
    database_url: Option<String>,

    /// address to listen on
    #[arg(long, env = "CHAINFUND_LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// seconds an emailed passcode stays valid
    #[arg(long, env = "CHAINFUND_OTP_EXPIRY_SECS")]
    otp_expiry_secs: Option<u64>,

    /// log level
    #[arg(long, env = "CHAINFUND_LOG_LEVEL")]
    log_level: Option<String>,
}

/// find and load a config file, returning none if no config file is found.
///
/// an explicit path must exist; otherwise the default locations are searched.
pub(crate) fn load_config_file(config_path: Option<&PathBuf>) -> Result<Option<Config>> {
    if let Some(path) = config_path {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {:?}", path))?;
        return Ok(Some(config));
    }

    for path_str in CONFIG_SEARCH_PATHS {
        let path = expand_tilde::expand_tilde(path_str)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| PathBuf::from(path_str));
        if path.exists() {
            debug!("Found config file at {:?}", path);
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file: {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("failed to parse config file: {:?}", path))?;
            return Ok(Some(config));
        }
    }

    Ok(None)
}

/// parse a database url into a database config.
pub(crate) fn parse_database_url(db_url: &str) -> Result<DatabaseConfig> {
    let parsed =
        url::Url::parse(db_url).with_context(|| format!("invalid database URL: {}", db_url))?;

    match parsed.scheme() {
        "postgres" | "postgresql" => Ok(DatabaseConfig {
            db_type: "postgres".to_string(),
            connection_string: db_url.to_string(),
            ..Default::default()
        }),
        "sqlite" => Ok(DatabaseConfig {
            db_type: "sqlite".to_string(),
            connection_string: parsed.path().to_string(),
            ..Default::default()
        }),
        scheme => bail!(
            "unsupported database scheme '{}', expected 'sqlite' or 'postgres'",
            scheme
        ),
    }
}

fn parse_log_level(level: Option<&str>) -> Level {
    match level.unwrap_or("info").to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

impl ServeCommand {
    /// convert cli arguments into a config struct, merging with config file if present.
    ///
    /// priority order: defaults -> config file -> cli flags / env
    fn into_config(self) -> Result<Config> {
        let mut config = match load_config_file(self.config.as_ref())? {
            Some(file_config) => {
                info!("Loaded configuration from file");
                file_config
            }
            None => {
                debug!("No config file found, using defaults");
                Config::default()
            }
        };

        if let Some(db_url) = self.database_url {
            config.database = parse_database_url(&db_url)?;
        }
        if let Some(listen_addr) = self.listen_addr {
            config.listen_addr = listen_addr;
        }
        if let Some(expiry) = self.otp_expiry_secs {
            if expiry == 0 {
                bail!("otp expiry must be at least one second");
            }
            config.otp.expiry_secs = expiry;
        }

        Ok(config)
    }

    /// run the serve command
    pub async fn run(self) -> Result<()> {
        let log_level = parse_log_level(self.log_level.as_deref());
        let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
        tracing::subscriber::set_global_default(subscriber)?;

        info!("Starting chainfund...");

        let config = self.into_config()?;
        info!("Database: {}", config.database.connection_string);
        info!("Listen address: {}", config.listen_addr);

        // ensure parent directory exists for sqlite databases
        if config.database.db_type == "sqlite" {
            let db_path = std::path::Path::new(&config.database.connection_string);
            if let Some(parent) = db_path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                info!("Creating database directory: {:?}", parent);
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create database directory: {:?}", parent)
                })?;
            }
        }

        let db = ChainfundDb::new(&config)
            .await
            .context("failed to open database")?;

        let addr: SocketAddr = config
            .listen_addr
            .parse()
            .with_context(|| format!("invalid listen address: {}", config.listen_addr))?;

        let mailer = mailer::from_config(&config.mailer);
        let app = create_app(db, config, mailer);

        info!("Listening on {}", addr);
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, app).await.context("server error")?;

        Ok(())
    }
}
