//! the `users` subcommand - manage users and admin roles

use chainfund_db::{ChainfundDb, Database};
use chainfund_types::{User, UserRole, WalletAddress};
use clap::{Args, Subcommand};
use color_eyre::eyre::{Context, Result, bail};

use super::DbArgs;

/// manage users
#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    /// list all users
    List(ListUsersArgs),

    /// grant the admin role to a user
    Promote(RoleArgs),

    /// revoke the admin role from a user
    Demote(RoleArgs),
}

/// list users
#[derive(Args, Debug)]
pub struct ListUsersArgs {
    #[command(flatten)]
    db: DbArgs,

    /// output format (table, json)
    #[arg(short, long, default_value = "table")]
    output: String,
}

/// change a user's role
#[derive(Args, Debug)]
pub struct RoleArgs {
    #[command(flatten)]
    db: DbArgs,

    /// wallet address of the user
    wallet: String,
}

impl UsersCommand {
    /// run the users command
    pub async fn run(self) -> Result<()> {
        match self {
            UsersCommand::List(args) => list_users(args).await,
            UsersCommand::Promote(args) => change_role(args, UserRole::Admin).await,
            UsersCommand::Demote(args) => change_role(args, UserRole::User).await,
        }
    }
}

async fn list_users(args: ListUsersArgs) -> Result<()> {
    let db = args.db.connect().await?;

    let users = db.list_users().await.context("failed to list users")?;

    if args.output == "json" {
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(());
    }

    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    println!(
        "{:<6} {:<20} {:<30} {:<14} {:<6} {:<8}",
        "ID", "NAME", "EMAIL", "WALLET", "ROLE", "VERIFIED"
    );
    println!("{}", "-".repeat(89));

    for user in users {
        println!(
            "{:<6} {:<20} {:<30} {:<14} {:<6} {:<8}",
            user.id.0,
            user.name,
            user.email.as_str(),
            user.wallet_address.short(),
            user.role,
            if user.is_verified { "yes" } else { "no" },
        );
    }

    Ok(())
}

async fn change_role(args: RoleArgs, role: UserRole) -> Result<()> {
    let wallet = WalletAddress::new(&args.wallet).context("invalid wallet address")?;
    let db = args.db.connect().await?;

    let user = set_role(&db, &wallet, role).await?;
    println!("User {} ({}) is now {}", user.name, user.wallet_address, user.role);
    Ok(())
}

async fn set_role(db: &ChainfundDb, wallet: &WalletAddress, role: UserRole) -> Result<User> {
    let Some(mut user) = db
        .get_user_by_wallet(wallet)
        .await
        .context("failed to query user")?
    else {
        bail!("no user with wallet {}", wallet);
    };

    if user.role == role {
        return Ok(user);
    }
    user.role = role;
    db.update_user(&user).await.context("failed to update user")
}
