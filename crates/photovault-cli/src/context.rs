//! Wiring shared by the commands that talk to the server or run the engine

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use photovault_client::{PhotoApiClient, ReachabilityMonitor};
use photovault_core::config::Config;
use photovault_sync::{FolderPhotoLibrary, SyncEngine, SyncEngineConfig, UploadLedger};

/// Loaded configuration plus where it came from
pub struct CliContext {
    pub config: Config,
    pub config_path: PathBuf,
}

impl CliContext {
    /// Loads `path` (or the default location); a missing file means defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Config::default_path);
        let mut config = if config_path.exists() {
            Config::load(&config_path)
                .with_context(|| format!("Failed to load {}", config_path.display()))?
        } else {
            Config::default()
        };
        config.apply_env_overrides();

        info!(config_path = %config_path.display(), "Loaded configuration");
        Ok(Self {
            config,
            config_path,
        })
    }

    /// Like [`CliContext::load`] but falls back to defaults on a broken file,
    /// so the config commands can still report on it
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Config::default_path);
        let mut config = Config::load_or_default(&config_path);
        config.apply_env_overrides();
        Self {
            config,
            config_path,
        }
    }

    pub fn api(&self) -> Result<Arc<PhotoApiClient>> {
        let client =
            PhotoApiClient::from_config(&self.config.client).context("Failed to build API client")?;
        Ok(Arc::new(client))
    }

    pub async fn ledger(&self) -> Result<Arc<UploadLedger>> {
        let path = &self.config.client.ledger_path;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create ledger directory")?;
        }
        let ledger = UploadLedger::open(path.clone())
            .await
            .context("Failed to open upload ledger")?;
        Ok(Arc::new(ledger))
    }

    /// Builds a sync engine over the configured library folder
    pub async fn engine(&self) -> Result<Arc<SyncEngine>> {
        let api = self.api()?;
        let network = Arc::new(ReachabilityMonitor::new(
            api.clone(),
            self.config.client.metered,
        ));
        let library = Arc::new(FolderPhotoLibrary::new(
            self.config.client.library_root.clone(),
        ));

        Ok(Arc::new(SyncEngine::new(
            library,
            api,
            network,
            self.ledger().await?,
            SyncEngineConfig::from_config(&self.config),
        )))
    }
}
