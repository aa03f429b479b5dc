//! PhotoVault storage server (photovaultd)
//!
//! Loads the YAML configuration, opens the selected metadata backend,
//! sweeps orphaned files, and serves the `/api/v1` router until SIGINT or
//! SIGTERM arrives. In-flight requests finish before the process exits.

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::Parser;
use photovault_core::{config::Config, ports::IMetadataStore};
use photovault_server::{create_router, AppState, ImageAnalyzer, PhotoStorageEngine};
use photovault_store::{DatabasePool, JsonMetadataStore, SqliteMetadataStore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// PhotoVault storage server
#[derive(Parser)]
#[command(name = "photovaultd", version)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long, env = "PHOTOVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind, overrides `server.bind_address`
    #[arg(long, env = "PHOTOVAULT_BIND")]
    bind: Option<String>,

    /// Storage root, overrides `storage.base_path`
    #[arg(long)]
    storage: Option<PathBuf>,

    /// Metadata backend (`json` or `sqlite`), overrides `server.backend`
    #[arg(long, env = "PHOTOVAULT_BACKEND")]
    backend: Option<String>,

    /// Run the orphan sweep and exit without serving
    #[arg(long)]
    reconcile_only: bool,
}

fn load_config(args: &Args) -> Result<Config> {
    let path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = if path.exists() {
        Config::load(&path).with_context(|| format!("loading {}", path.display()))?
    } else {
        Config::default()
    };

    config.apply_env_overrides();
    if let Some(bind) = &args.bind {
        config.server.bind_address = bind.clone();
    }
    if let Some(storage) = &args.storage {
        config.storage.base_path = storage.clone();
    }
    if let Some(backend) = &args.backend {
        config.server.backend = backend.clone();
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!(%e, "Invalid configuration");
        }
        bail!("configuration has {} error(s)", errors.len());
    }
    Ok(config)
}

fn configure_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn open_store(config: &Config) -> Result<Arc<dyn IMetadataStore>> {
    let store: Arc<dyn IMetadataStore> = match config.server.backend.as_str() {
        "sqlite" => {
            let db_path = config.storage.database_file();
            info!(path = %db_path.display(), "Opening SQLite metadata store");
            let pool = DatabasePool::new(&db_path)
                .await
                .context("opening metadata database")?;
            Arc::new(SqliteMetadataStore::new(pool.pool().clone()))
        }
        _ => {
            let file = config.storage.metadata_file();
            info!(path = %file.display(), "Using JSON metadata store");
            Arc::new(JsonMetadataStore::new(file))
        }
    };
    Ok(store)
}

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }

    token.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    configure_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        storage = %config.storage.base_path.display(),
        backend = %config.server.backend,
        "photovaultd starting"
    );

    let store = open_store(&config).await?;
    let engine = Arc::new(PhotoStorageEngine::new(
        &config.storage,
        store,
        Arc::new(ImageAnalyzer::new()),
    ));
    engine
        .ensure_layout()
        .await
        .context("creating storage layout")?;

    if config.storage.reconcile_on_startup || args.reconcile_only {
        match engine.reconcile_orphans().await {
            Ok(report) => info!(
                scanned = report.scanned,
                removed = report.removed,
                temp_removed = report.temp_removed,
                "Startup reconciliation finished"
            ),
            Err(e) => warn!(error = %e, "Startup reconciliation failed"),
        }
    }
    if args.reconcile_only {
        return Ok(());
    }

    let max_upload_bytes = usize::try_from(config.server.max_upload_mb)
        .unwrap_or(usize::MAX / (1024 * 1024))
        .saturating_mul(1024 * 1024);
    let app = create_router(AppState::new(engine, max_upload_bytes));

    let addr = config.server.bind_address.as_str();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("photovaultd listening on http://{addr}");

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("server error")?;

    info!("photovaultd shut down gracefully");
    Ok(())
}
