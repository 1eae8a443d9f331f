//! the `approvals` subcommand - inspect the milestone approval queue

use chainfund_approvals::ApprovalEngine;
use chainfund_types::ApprovalId;
use clap::{Args, Subcommand};
use color_eyre::eyre::{Context, Result};

use super::DbArgs;

/// inspect milestone approvals
#[derive(Subcommand, Debug)]
pub enum ApprovalsCommand {
    /// list pending approval requests
    Pending(PendingArgs),

    /// show approval counts and mean decision time
    Stats(StatsArgs),

    /// show the audit trail of one approval
    History(HistoryArgs),
}

/// list pending approvals
#[derive(Args, Debug)]
pub struct PendingArgs {
    #[command(flatten)]
    db: DbArgs,

    /// output format (table, json)
    #[arg(short, long, default_value = "table")]
    output: String,
}

/// show statistics
#[derive(Args, Debug)]
pub struct StatsArgs {
    #[command(flatten)]
    db: DbArgs,
}

/// show an approval's history
#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(flatten)]
    db: DbArgs,

    /// approval id
    approval_id: u64,
}

impl ApprovalsCommand {
    /// run the approvals command
    pub async fn run(self) -> Result<()> {
        match self {
            ApprovalsCommand::Pending(args) => pending(args).await,
            ApprovalsCommand::Stats(args) => stats(args).await,
            ApprovalsCommand::History(args) => history(args).await,
        }
    }
}

async fn pending(args: PendingArgs) -> Result<()> {
    let engine = ApprovalEngine::new(args.db.connect().await?);
    let queue = engine
        .list_pending_with_stats()
        .await
        .context("failed to list pending approvals")?;

    if args.output == "json" {
        println!("{}", serde_json::to_string_pretty(&queue.approvals)?);
        return Ok(());
    }

    if queue.approvals.is_empty() {
        println!("No pending approvals.");
        return Ok(());
    }

    println!(
        "{:<6} {:<9} {:<10} {:<14} {:<12} {:<6} {:<20}",
        "ID", "CAMPAIGN", "MILESTONE", "CREATOR", "AMOUNT", "DOCS", "REQUESTED"
    );
    println!("{}", "-".repeat(83));

    for a in queue.approvals {
        println!(
            "{:<6} {:<9} {:<10} {:<14} {:<12} {:<6} {:<20}",
            a.id.0,
            a.campaign_id.0,
            a.milestone_index,
            a.creator_wallet.short(),
            a.requested_amount,
            a.documents.len(),
            a.created_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }

    Ok(())
}

async fn stats(args: StatsArgs) -> Result<()> {
    let engine = ApprovalEngine::new(args.db.connect().await?);
    let stats = engine
        .list_pending_with_stats()
        .await
        .context("failed to compute approval stats")?
        .stats;

    println!("Pending:        {}", stats.total_pending);
    println!("Approved:       {}", stats.total_approved);
    println!("Rejected:       {}", stats.total_rejected);
    println!("Auto-verified:  {}", stats.total_auto_verified);
    println!("Avg decision:   {:.2}h", stats.average_processing_time);

    Ok(())
}

async fn history(args: HistoryArgs) -> Result<()> {
    let engine = ApprovalEngine::new(args.db.connect().await?);
    let events = engine
        .history(ApprovalId(args.approval_id))
        .await
        .with_context(|| format!("failed to load history of approval {}", args.approval_id))?;

    for event in events {
        println!(
            "{}  {:<15} {:<44} {}",
            event.created_at.format("%Y-%m-%d %H:%M:%S"),
            event.action,
            event.actor,
            event.details,
        );
    }

    Ok(())
}
