//! wallai-sw entry point.
//!
//! Drives the offline worker against a SQLite-backed cache store and the
//! budget delete flow against the live server. Results are printed to stdout
//! as JSON; logging goes to stderr.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wallai_core::AppConfig;

mod commands;
mod view;

/// Wallai offline worker and budget tools.
#[derive(Parser, Debug)]
#[command(name = "wallai-sw", version, about = "Wallai offline worker")]
struct Cli {
    /// TOML configuration file (takes precedence over WALLAI_CONFIG_FILE).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Precache the application shell into the current cache generation.
    Install,
    /// Install, then delete stores left by previous generations.
    Activate,
    /// Offer a request to the worker and report how it was served.
    Fetch {
        /// Origin-relative path or absolute URL.
        target: String,

        /// Treat the request as a top-level navigation.
        #[arg(long)]
        navigate: bool,

        #[arg(long, default_value = "GET")]
        method: String,
    },
    /// List cache stores.
    Stores {
        /// Include the URLs held by each store.
        #[arg(long)]
        entries: bool,
    },
    /// Print the notification shown for a push message.
    Push,
    /// Delete a budget after typing the confirmation phrase.
    Delete {
        budget_id: u64,

        /// Budget name shown in the undo toast.
        #[arg(long, default_value = "")]
        name: String,

        /// Confirmation phrase.
        #[arg(long)]
        confirm: String,

        /// Restore the budget right after deleting it.
        #[arg(long)]
        undo: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => AppConfig::load_from(Some(path))?,
        None => AppConfig::load()?,
    };
    tracing::debug!(origin = %config.origin, version = %config.cache_version, "configuration loaded");

    let output = match cli.command {
        Command::Install => commands::install(&config).await?,
        Command::Activate => commands::activate(&config).await?,
        Command::Fetch { target, navigate, method } => commands::fetch(&config, &target, navigate, &method).await?,
        Command::Stores { entries } => commands::stores(&config, entries).await?,
        Command::Push => commands::push()?,
        Command::Delete { budget_id, name, confirm, undo } => {
            commands::delete(&config, budget_id, name, &confirm, undo).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
