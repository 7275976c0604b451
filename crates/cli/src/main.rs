//! Orchard CLI - Database migrations and store settings.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! orchard-cli migrate
//!
//! # Inspect and change store settings
//! orchard-cli settings list
//! orchard-cli settings get affiliate_discount_rate
//! orchard-cli settings set affiliate_discount_rate 15
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `settings` - Read and write the settings the storefront loads at startup

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "orchard-cli")]
#[command(author, version, about = "Orchard CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage store settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print every stored setting
    List,
    /// Print one setting
    Get {
        /// Setting key, e.g. `tax_rate`
        key: String,
    },
    /// Store one setting
    Set {
        /// Setting key, e.g. `tax_rate`
        key: String,
        /// New value
        value: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Settings { action } => match action {
            SettingsAction::List => commands::settings::list().await?,
            SettingsAction::Get { key } => commands::settings::get(&key).await?,
            SettingsAction::Set { key, value } => commands::settings::set(&key, &value).await?,
        },
    }
    Ok(())
}
