//! chainfund - milestone-gated crowdfunding backend

use chainfund::cli::{Cli, Command};
use clap::Parser;
use color_eyre::eyre::Result;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(cmd) => cmd.run().await,
        Command::Users(cmd) => cmd.run().await,
        Command::Approvals(cmd) => cmd.run().await,
    }
}
