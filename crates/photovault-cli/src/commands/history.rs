//! History command - Inspect or forget the upload ledger
//!
//! Clearing the ledger makes the next pass consider every local photo
//! again; the server's checksum dedup keeps that from storing copies.

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::context::CliContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum HistoryCommand {
    /// List backed-up items, most recent first
    List {
        /// Show at most this many entries
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Forget every backed-up item
    Clear {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
}

impl HistoryCommand {
    pub async fn execute(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        match self {
            HistoryCommand::List { limit } => self.execute_list(ctx, *limit, format).await,
            HistoryCommand::Clear { yes } => self.execute_clear(ctx, *yes, format).await,
        }
    }

    async fn execute_list(&self, ctx: &CliContext, limit: usize, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let ledger = ctx.ledger().await?;

        let mut entries = ledger.entries().await;
        entries.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        let total = entries.len();
        entries.truncate(limit);

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "total": total,
                "entries": entries,
            }));
            return Ok(());
        }

        formatter.success(&format!("{total} item(s) backed up"));
        for entry in &entries {
            formatter.info(&format!(
                "{}  {}  -> {:?}",
                entry.uploaded_at.format("%Y-%m-%d %H:%M"),
                entry.local_asset_id,
                entry.server_photo_id
            ));
        }
        if total > entries.len() {
            formatter.info(&format!("... {} more", total - entries.len()));
        }
        Ok(())
    }

    async fn execute_clear(&self, ctx: &CliContext, yes: bool, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        if !yes && !confirm("Forget all backed-up items?")? {
            formatter.info("Aborted");
            return Ok(());
        }

        let engine = ctx.engine().await?;
        let count = engine.ledger().count().await;
        engine
            .clear_history()
            .await
            .context("Failed to clear upload history")?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({ "success": true, "cleared": count }));
        } else {
            formatter.success(&format!("Cleared {count} ledger entries"));
        }
        Ok(())
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    use std::io::Write;

    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
