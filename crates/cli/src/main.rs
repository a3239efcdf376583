//! Shopfront CLI - Operator tools for the shop database.
//!
//! # Usage
//!
//! ```bash
//! # Load products from a JSON or YAML file
//! sf-cli seed products catalog.yaml
//!
//! # Grant back-office access
//! sf-cli user role ops@example.com admin
//!
//! # Create and list promo codes
//! sf-cli promo create -c SPRING10 -p 10 -e 2026-06-30
//! sf-cli promo list
//! ```
//!
//! # Commands
//!
//! - `seed products` - Insert or replace products from a file
//! - `user role` - Change a profile's role
//! - `promo create` / `promo list` - Manage promo codes

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sf-cli")]
#[command(author, version, about = "Shopfront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the database from files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage user profiles
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage promo codes
    Promo {
        #[command(subcommand)]
        action: PromoAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert products from a JSON or YAML list
    Products {
        /// Path to the file (`.json`, `.yaml` or `.yml`)
        file: String,

        /// Delete every existing product first
        #[arg(long)]
        replace: bool,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Set a user's role
    Role {
        /// Email address or user id
        user: String,

        /// Role (`customer`, `admin`)
        role: String,
    },
}

#[derive(Subcommand)]
enum PromoAction {
    /// Create a promo code
    Create {
        /// Code (stored uppercased)
        #[arg(short, long)]
        code: String,

        /// Discount percent, 1-100
        #[arg(short, long)]
        percent: u32,

        /// Expiry date (YYYY-MM-DD), inclusive
        #[arg(short, long)]
        expires: String,

        /// `all`, or product ids separated by commas
        #[arg(long, default_value = "all")]
        products: String,
    },
    /// List promo codes
    List,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Seed { target } => match target {
            SeedTarget::Products { file, replace } => {
                let db = commands::connect()?;
                commands::seed::products(&db, &file, replace).await?;
            }
        },
        Commands::User { action } => match action {
            UserAction::Role { user, role } => {
                let db = commands::connect()?;
                commands::user::set_role(&db, &user, &role).await?;
            }
        },
        Commands::Promo { action } => {
            let db = commands::connect()?;
            match action {
                PromoAction::Create {
                    code,
                    percent,
                    expires,
                    products,
                } => {
                    commands::promo::create(&db, &code, percent, &expires, &products).await?;
                }
                PromoAction::List => commands::promo::list(&db).await?,
            }
        }
    }
    Ok(())
}
