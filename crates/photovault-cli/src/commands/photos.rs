//! Photos command - Browse and manage what the server stores

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;

use photovault_core::domain::{ListParams, ListQuery, PhotoId};

use crate::context::CliContext;
use crate::output::{get_formatter, human_bytes, OutputFormat, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum PhotosCommand {
    /// List stored photos
    List {
        #[arg(long, default_value = "1")]
        page: i64,
        #[arg(long, default_value = "50")]
        per_page: i64,
        /// createdAt, takenAt, filename or size
        #[arg(long, default_value = "createdAt")]
        sort_by: String,
        /// asc or desc
        #[arg(long, default_value = "desc")]
        order: String,
        /// Only photos ingested in this year
        #[arg(long)]
        year: Option<i32>,
        /// Only photos ingested in this month (1-12)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },
    /// Show metadata of one photo
    Info { id: PhotoId },
    /// Download the original
    Download {
        id: PhotoId,
        /// Destination file (defaults to the original filename)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Download the thumbnail
    Thumbnail {
        id: PhotoId,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a photo from the server
    Delete { id: PhotoId },
}

impl PhotosCommand {
    pub async fn execute(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let api = ctx.api()?;

        match self {
            PhotosCommand::List {
                page,
                per_page,
                sort_by,
                order,
                year,
                month,
            } => {
                let query = ListQuery::from(ListParams {
                    page: Some(*page),
                    per_page: Some(*per_page),
                    sort_by: Some(sort_by.clone()),
                    order: Some(order.clone()),
                    year: *year,
                    month: *month,
                });
                let result = api.list(&query).await.context("Failed to list photos")?;

                if format.is_json() {
                    formatter.print_json(&serde_json::to_value(&result)?);
                    return Ok(());
                }
                let p = &result.pagination;
                formatter.success(&format!(
                    "Page {}/{} ({} photos)",
                    p.page,
                    p.total_pages.max(1),
                    p.total_items
                ));
                for photo in &result.data {
                    formatter.info(&format!(
                        "{}  {:<32} {:>10}  {}",
                        photo.id,
                        photo.filename,
                        human_bytes(photo.size),
                        photo.created_at.format("%Y-%m-%d")
                    ));
                }
            }

            PhotosCommand::Info { id } => {
                let photo = api.get(id).await.context("Failed to fetch photo")?;
                if format.is_json() {
                    formatter.print_json(&serde_json::to_value(&photo)?);
                    return Ok(());
                }
                formatter.success(&photo.filename);
                formatter.field("ID", &photo.id.to_string());
                formatter.field("Type", &photo.mime_type);
                formatter.field("Size", &human_bytes(photo.size));
                if let (Some(w), Some(h)) = (photo.width, photo.height) {
                    formatter.field("Dimensions", &format!("{w}x{h}"));
                }
                formatter.field("Uploaded", &photo.created_at.to_rfc3339());
                if let Some(taken) = photo.taken_at {
                    formatter.field("Taken", &taken.to_rfc3339());
                }
                formatter.field("Checksum", photo.checksum.as_str());
            }

            PhotosCommand::Download { id, output } => {
                let dest = match output {
                    Some(path) => path.clone(),
                    // Only the final component; the server-side name is untrusted
                    None => {
                        let filename = api.get(id).await?.filename;
                        Path::new(&filename)
                            .file_name()
                            .map(PathBuf::from)
                            .unwrap_or_else(|| PathBuf::from(id.to_string()))
                    }
                };
                let bytes = api
                    .download_to(id, &dest)
                    .await
                    .context("Failed to download photo")?;
                report_saved(&*formatter, format, &dest, bytes);
            }

            PhotosCommand::Thumbnail { id, output } => {
                let dest = output
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(format!("{id}-thumb.jpg")));
                let data = api.thumbnail(id).await.context("Failed to fetch thumbnail")?;
                tokio::fs::write(&dest, &data)
                    .await
                    .with_context(|| format!("Failed to write {}", dest.display()))?;
                report_saved(&*formatter, format, &dest, data.len() as u64);
            }

            PhotosCommand::Delete { id } => {
                api.delete(id).await.context("Failed to delete photo")?;
                if format.is_json() {
                    formatter.print_json(&serde_json::json!({"success": true, "deleted": id}));
                } else {
                    formatter.success(&format!("Deleted {id}"));
                }
            }
        }
        Ok(())
    }
}

fn report_saved(
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
    dest: &Path,
    bytes: u64,
) {
    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "path": dest.display().to_string(),
            "bytes": bytes,
        }));
    } else {
        formatter.success(&format!("Saved {} ({})", dest.display(), human_bytes(bytes)));
    }
}
