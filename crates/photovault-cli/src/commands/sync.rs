//! Sync command - Back up the local library once
//!
//! `photovault sync` runs one full pass in the foreground. With
//! `--background` it runs the bounded variant instead: at most `--limit`
//! items, stopped early by Ctrl+C or by `--budget-secs`.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tracing::info;

use photovault_core::domain::SyncStatus;
use photovault_sync::{BackgroundSyncJob, SyncSummary};

use crate::context::CliContext;
use crate::output::{get_formatter, human_duration, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Run a bounded, cancellable pass
    #[arg(long)]
    pub background: bool,

    /// Maximum uploads in a background pass (defaults to `sync.background_batch_limit`)
    #[arg(long, requires = "background")]
    pub limit: Option<usize>,

    /// Stop a background pass after this many seconds
    #[arg(long, requires = "background")]
    pub budget_secs: Option<u64>,

    /// List what would be uploaded without uploading
    #[arg(long, conflicts_with = "background")]
    pub dry_run: bool,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let engine = ctx.engine().await?;

        if self.dry_run {
            let pending = engine.pending().await?;
            if format.is_json() {
                let items: Vec<_> = pending
                    .iter()
                    .map(|a| serde_json::json!({"id": a.id.as_str(), "filename": a.filename}))
                    .collect();
                formatter.print_json(&serde_json::json!({ "pending": items }));
            } else {
                formatter.success(&format!("{} item(s) would be uploaded", pending.len()));
                for asset in &pending {
                    formatter.info(&asset.filename);
                }
            }
            return Ok(());
        }

        let summary = if self.background {
            let limit = self
                .limit
                .unwrap_or(ctx.config.sync.background_batch_limit);
            let job = BackgroundSyncJob::new(engine.clone(), limit);

            let token = job.cancellation_token();
            let ctrl_c = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupted, cancelling background pass");
                    token.cancel();
                }
            });

            formatter.info(&format!("Starting background sync (limit {limit})..."));
            let summary = match self.budget_secs {
                Some(secs) => job.run_with_budget(Duration::from_secs(secs)).await,
                None => job.run().await,
            };
            ctrl_c.abort();
            summary
        } else {
            formatter.info("Starting synchronization...");
            match engine.trigger().await {
                Some(summary) => summary,
                None => {
                    formatter.warn("Sync is paused or already running");
                    return Ok(());
                }
            }
        };

        let state = engine.state();
        print_summary(&*formatter, format, &summary);
        if let SyncStatus::Error(message) = &state.status {
            formatter.error(message);
        } else if !matches!(state.status, SyncStatus::Idle) {
            formatter.warn(&format!("Engine finished in state {:?}", state.status));
        }
        Ok(())
    }
}

fn print_summary(
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
    summary: &SyncSummary,
) {
    if format.is_json() {
        formatter.print_json(&serde_json::to_value(summary).unwrap_or_default());
        return;
    }

    let verb = if summary.cancelled {
        "Sync cancelled"
    } else {
        "Sync completed"
    };
    formatter.success(&format!("{verb} in {}", human_duration(summary.duration_ms)));
    formatter.field("Uploaded", &summary.uploaded.to_string());
    formatter.field("Already backed up", &summary.skipped.to_string());
    formatter.field("Failed", &summary.failed.to_string());
    formatter.field("Considered", &summary.total.to_string());
    for error in &summary.errors {
        formatter.warn(error);
    }
}
