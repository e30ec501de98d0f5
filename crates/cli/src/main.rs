//! Estate Desk CLI - Database migrations and account bootstrap.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! ed-cli migrate
//!
//! # Create the first broker account
//! ed-cli user create -e broker@example.com -r broker --password 'S3cure-pass'
//!
//! # Create an advisor account linked to employee 4
//! ed-cli user create -e ana@example.com -r advisor --employee-id 4
//!
//! # Reset a forgotten password
//! ed-cli user reset-password -e ana@example.com
//! ```
//!
//! Passwords can also be passed through `ED_CLI_PASSWORD` to keep them out
//! of shell history.
//!
//! # Environment Variables
//!
//! - `API_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ed-cli")]
#[command(author, version, about = "Estate Desk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage login accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a login account
    Create {
        /// Login email address
        #[arg(short, long)]
        email: String,

        /// Account role (`broker`, `secretary`, `advisor`)
        #[arg(short, long, default_value = "broker")]
        role: String,

        /// Employee to link; required for advisors
        #[arg(long)]
        employee_id: Option<i32>,

        /// Initial password
        #[arg(long, env = "ED_CLI_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Replace an account's password
    ResetPassword {
        /// Login email address
        #[arg(short, long)]
        email: String,

        /// New password
        #[arg(long, env = "ED_CLI_PASSWORD", hide_env_values = true)]
        password: String,
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
            UserAction::Create {
                email,
                role,
                employee_id,
                password,
            } => {
                commands::user::create(&email, &role, employee_id, &password).await?;
            }
            UserAction::ResetPassword { email, password } => {
                commands::user::reset_password(&email, &password).await?;
            }
        },
    }
    Ok(())
}
