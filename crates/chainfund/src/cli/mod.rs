//! cli subcommands for chainfund.
//!
//! - `chainfund serve` - run the http server
//! - `chainfund users list|promote|demote` - manage admin roles
//! - `chainfund approvals pending|stats|history` - inspect the approval queue

mod approvals;
pub mod serve;
mod users;

pub use approvals::ApprovalsCommand;
pub use serve::ServeCommand;
pub use users::UsersCommand;

use std::path::PathBuf;

use chainfund_db::ChainfundDb;
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result};

/// chainfund - milestone-gated crowdfunding backend
#[derive(Parser, Debug)]
#[command(name = "chainfund")]
#[command(about = "Milestone-gated crowdfunding backend", long_about = None)]
#[command(version)]
pub struct Cli {
    /// the command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// top-level commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// run the http server
    Serve(ServeCommand),

    /// manage users
    #[command(subcommand)]
    Users(UsersCommand),

    /// inspect milestone approvals
    #[command(subcommand)]
    Approvals(ApprovalsCommand),
}

/// database selection shared by the admin subcommands.
#[derive(Args, Debug)]
pub struct DbArgs {
    /// path to config file (toml format)
    #[arg(short, long, env = "CHAINFUND_CONFIG")]
    config: Option<PathBuf>,

    /// database url (sqlite:// or postgres://)
    #[arg(long, env = "CHAINFUND_DATABASE_URL")]
    database_url: Option<String>,
}

impl DbArgs {
    /// open the configured database, running migrations.
    pub async fn connect(&self) -> Result<ChainfundDb> {
        let mut config = serve::load_config_file(self.config.as_ref())?.unwrap_or_default();
        if let Some(db_url) = &self.database_url {
            config.database = serve::parse_database_url(db_url)?;
        }
        ChainfundDb::new(&config)
            .await
            .with_context(|| format!("failed to open database {}", config.database.connection_string))
    }
}
