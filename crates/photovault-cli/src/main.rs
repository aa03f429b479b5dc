//! PhotoVault CLI - Back up a photo folder to a PhotoVault server
//!
//! Provides commands for:
//! - Running a backup pass, once or bounded in the background
//! - Watching the library and uploading new photos as they appear
//! - Inspecting server health and local backup progress
//! - Browsing, downloading and deleting stored photos
//! - Managing the upload ledger and the configuration file

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;

use commands::{
    config::ConfigCommand, history::HistoryCommand, photos::PhotosCommand,
    status::StatusCommand, sync::SyncCommand, watch::WatchCommand,
};
use context::CliContext;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "photovault", version, about = "Photo backup client for PhotoVault")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true, env = "PHOTOVAULT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Back up new photos now
    Sync(SyncCommand),
    /// Keep backing up as photos are added
    Watch(WatchCommand),
    /// Show server health and backup progress
    Status(StatusCommand),
    /// Inspect or clear the upload ledger
    #[command(subcommand)]
    History(HistoryCommand),
    /// Browse and manage photos on the server
    #[command(subcommand)]
    Photos(PhotosCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = match &cli.command {
        Commands::Config(_) => CliContext::load_or_default(cli.config.as_deref()),
        _ => CliContext::load(cli.config.as_deref())?,
    };

    match &cli.command {
        Commands::Sync(cmd) => cmd.execute(&ctx, format).await,
        Commands::Watch(cmd) => cmd.execute(&ctx, format).await,
        Commands::Status(cmd) => cmd.execute(&ctx, format).await,
        Commands::History(cmd) => cmd.execute(&ctx, format).await,
        Commands::Photos(cmd) => cmd.execute(&ctx, format).await,
        Commands::Config(cmd) => cmd.execute(&ctx, format).await,
    }
}
