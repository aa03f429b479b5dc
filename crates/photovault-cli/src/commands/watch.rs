//! Watch command - Keep the library backed up while running
//!
//! Runs an initial full pass, then uploads new photos as the folder
//! watcher reports them. Progress is logged from the engine's state
//! channel. Ctrl+C stops the watcher and waits for the dispatcher to drain.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use photovault_core::ports::IChangeNotifier;
use photovault_sync::{ChangeDispatcher, FolderChangeNotifier};

use crate::context::CliContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Skip the initial full pass
    #[arg(long)]
    pub no_initial_sync: bool,
}

impl WatchCommand {
    pub async fn execute(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let engine = ctx.engine().await?;

        if !engine.is_auto_sync_enabled() {
            formatter.warn("client.auto_sync is off; changes will be ignored");
        }

        let shutdown = CancellationToken::new();
        let (dispatcher, sink) = ChangeDispatcher::new(engine.clone(), shutdown.clone());
        let dispatcher = tokio::spawn(dispatcher.run());

        let mut states = engine.subscribe();
        let progress_shutdown = shutdown.clone();
        let progress = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = progress_shutdown.cancelled() => break,
                    changed = states.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = states.borrow_and_update().clone();
                        info!(
                            status = ?state.status,
                            uploaded = state.uploaded_count,
                            failed = state.failed_count,
                            total = state.total_count,
                            "Sync state"
                        );
                    }
                }
            }
        });

        let notifier = FolderChangeNotifier::new(
            ctx.config.client.library_root.clone(),
            Duration::from_millis(ctx.config.sync.debounce_ms),
        );
        notifier
            .start(sink)
            .context("Failed to watch the library folder")?;
        formatter.success(&format!(
            "Watching {} (Ctrl+C to stop)",
            ctx.config.client.library_root.display()
        ));

        if !self.no_initial_sync {
            if let Some(summary) = engine.trigger().await {
                formatter.info(&format!(
                    "Initial pass: {} uploaded, {} failed",
                    summary.uploaded, summary.failed
                ));
            }
        }

        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl+C, stopping");
        }

        notifier.stop();
        shutdown.cancel();
        let batches = dispatcher.await.unwrap_or(0);
        let _ = progress.await;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "batches": batches,
                "state": engine.state(),
            }));
        } else {
            formatter.success(&format!("Stopped after {batches} change batch(es)"));
        }
        Ok(())
    }
}
