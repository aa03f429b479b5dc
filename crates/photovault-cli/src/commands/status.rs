//! Status command - Server reachability and local backup progress

use anyhow::Result;
use clap::Args;

use crate::context::CliContext;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Skip scanning the library for pending items
    #[arg(long)]
    pub no_scan: bool,
}

impl StatusCommand {
    pub async fn execute(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let api = ctx.api()?;
        let engine = ctx.engine().await?;

        let health = api.health().await;
        let backed_up = engine.ledger().count().await;
        let pending = if self.no_scan {
            None
        } else {
            match engine.pending().await {
                Ok(items) => Some(items.len()),
                Err(e) => {
                    formatter.warn(&format!("Cannot scan library: {e}"));
                    None
                }
            }
        };

        if format.is_json() {
            let server = match &health {
                Ok(h) => serde_json::json!({
                    "reachable": true,
                    "status": h.status,
                    "version": h.version,
                    "storageAvailable": h.storage_available,
                }),
                Err(e) => serde_json::json!({ "reachable": false, "error": e.to_string() }),
            };
            formatter.print_json(&serde_json::json!({
                "server": server,
                "serverUrl": api.base_url(),
                "libraryRoot": ctx.config.client.library_root.display().to_string(),
                "backedUp": backed_up,
                "pending": pending,
                "autoSync": ctx.config.client.auto_sync,
                "wifiOnly": ctx.config.client.wifi_only,
            }));
            return Ok(());
        }

        match &health {
            Ok(h) if h.is_healthy() => {
                formatter.success(&format!("Server {} is healthy (v{})", api.base_url(), h.version))
            }
            Ok(h) => formatter.warn(&format!(
                "Server {} reports {} (storage available: {})",
                api.base_url(),
                h.status,
                h.storage_available
            )),
            Err(e) => formatter.error(&format!("Server {} unreachable: {e}", api.base_url())),
        }

        formatter.field(
            "Library",
            &ctx.config.client.library_root.display().to_string(),
        );
        formatter.field("Backed up", &backed_up.to_string());
        if let Some(pending) = pending {
            formatter.field("Pending", &pending.to_string());
        }
        formatter.field("Auto sync", &ctx.config.client.auto_sync.to_string());
        formatter.field("Wi-Fi only", &ctx.config.client.wifi_only.to_string());
        Ok(())
    }
}
