//! Account service CLI - Database migrations and account administration.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! accounts-cli migrate
//!
//! # Clear a login lockout
//! accounts-cli user unlock -e user@example.com
//!
//! # Change a user's role
//! accounts-cli user set-role -e user@example.com -r MANAGER
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user unlock` - Reset the failed-login counter and clear the lock
//! - `user set-role` - Assign a role

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "accounts-cli")]
#[command(author, version, about = "Account service CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Clear a failed-login lockout
    Unlock {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Assign a role to a user
    SetRole {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Role (`ANONYMOUS`, `AUTHENTICATED`, `MANAGER`, `ADMIN`)
        #[arg(short, long)]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Unlock { email } => commands::user::unlock(&email).await?,
            UserAction::SetRole { email, role } => {
                commands::user::set_role(&email, &role).await?;
            }
        },
    }
    Ok(())
}
