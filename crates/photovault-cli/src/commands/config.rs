//! Config command - View and manage PhotoVault configuration
//!
//! `show` prints the effective configuration, `set` edits one dotted key,
//! `validate` checks the file on disk and `init` writes the defaults.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tracing::info;

use photovault_core::config::Config;

use crate::context::CliContext;
use crate::output::{get_formatter, OutputFormat};

/// Keys accepted by `config set`, with a short description
const SETTABLE_KEYS: &[(&str, &str)] = &[
    ("server.bind_address", "Listen address of photovaultd"),
    ("server.max_upload_mb", "Largest accepted upload (MiB)"),
    ("server.backend", "json|sqlite"),
    ("storage.base_path", "Server storage root"),
    ("storage.thumbnail_size", "Thumbnail longest edge (px)"),
    ("storage.reconcile_on_startup", "true|false"),
    ("client.server_url", "Base URL of the server"),
    ("client.library_root", "Local folder to back up"),
    ("client.ledger_path", "Upload ledger file"),
    ("client.wifi_only", "true|false"),
    ("client.metered", "true|false"),
    ("client.auto_sync", "true|false"),
    ("client.request_timeout_secs", "Per-request timeout"),
    ("sync.background_batch_limit", "Uploads per background pass"),
    ("sync.recent_outcomes_capacity", "Outcomes kept for display"),
    ("sync.upload_retries", "Attempts per upload"),
    ("sync.debounce_ms", "Quiet period for library changes"),
    ("logging.level", "trace|debug|info|warn|error"),
    ("logging.format", "pretty|json"),
];

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "client.server_url")
        key: String,
        /// New value
        value: String,
    },
    /// Validate the configuration file
    Validate,
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CliContext, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(ctx, format),
            ConfigCommand::Set { key, value } => execute_set(ctx, key, value, format),
            ConfigCommand::Validate => execute_validate(&ctx.config_path, format),
            ConfigCommand::Init { force } => execute_init(&ctx.config_path, *force, format),
        }
    }
}

fn execute_show(ctx: &CliContext, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);

    if format.is_json() {
        let json =
            serde_json::to_value(&ctx.config).context("Failed to serialize configuration")?;
        formatter.print_json(&json);
        return Ok(());
    }

    formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
    formatter.info("");
    for line in ctx.config.to_yaml()?.lines() {
        formatter.info(line);
    }
    Ok(())
}

fn execute_set(ctx: &CliContext, key: &str, value: &str, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    if ctx.config_path.exists() {
        if let Err(e) = Config::load(&ctx.config_path) {
            formatter.error(&format!(
                "Refusing to overwrite unparseable {}: {e}",
                ctx.config_path.display()
            ));
            return Ok(());
        }
    }
    let mut config = ctx.config.clone();

    info!(key = %key, value = %value, "Setting configuration value");

    if let Err(e) = apply_config_value(&mut config, key, value) {
        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": false,
                "key": key,
                "error": e.to_string(),
            }));
        } else {
            formatter.error(&format!("Failed to set '{key}': {e}"));
            formatter.info("");
            formatter.info("Supported keys:");
            for (name, help) in SETTABLE_KEYS {
                formatter.info(&format!("  {name:<32} {help}"));
            }
        }
        return Ok(());
    }

    let errors: Vec<String> = config
        .validate()
        .iter()
        .filter(|e| e.field == key)
        .map(|e| e.message.clone())
        .collect();
    if !errors.is_empty() {
        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": false,
                "key": key,
                "errors": errors,
            }));
        } else {
            formatter.error(&format!("Invalid value for '{key}': {}", errors.join("; ")));
        }
        return Ok(());
    }

    write_config(&ctx.config_path, &config)?;

    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "key": key,
            "value": value,
            "config_path": ctx.config_path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Set {key} = {value}"));
        formatter.info(&format!("Saved to {}", ctx.config_path.display()));
    }
    Ok(())
}

fn execute_validate(config_path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);

    if !config_path.exists() {
        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "valid": false,
                "config_path": config_path.display().to_string(),
                "errors": ["Configuration file not found. Using defaults."],
            }));
        } else {
            formatter.info(&format!(
                "Configuration file not found at {}",
                config_path.display()
            ));
            formatter.info("Run 'photovault config init' to create one.");
        }
        return Ok(());
    }

    let config = match Config::load(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "valid": false,
                    "config_path": config_path.display().to_string(),
                    "errors": [format!("Failed to parse configuration: {e}")],
                }));
            } else {
                formatter.error(&format!("Failed to parse configuration: {e}"));
                formatter.info(&format!("File: {}", config_path.display()));
            }
            return Ok(());
        }
    };

    let errors = config.validate();
    if format.is_json() {
        let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": config_path.display().to_string(),
            "errors": error_strings,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", config_path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }
    Ok(())
}

fn execute_init(config_path: &Path, force: bool, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);

    if config_path.exists() && !force {
        formatter.error(&format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        ));
        return Ok(());
    }

    write_config(config_path, &Config::default())?;
    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "config_path": config_path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Wrote defaults to {}", config_path.display()));
    }
    Ok(())
}

fn write_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    std::fs::write(path, config.to_yaml()?).context("Failed to write configuration file")?;
    Ok(())
}

fn parse<T: std::str::FromStr>(key: &str, value: &str, expected: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| anyhow::anyhow!("Expected {expected} for {key}"))
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    const INT: &str = "a positive integer";
    const BOOL: &str = "true or false";

    match key {
        // --- server ---
        "server.bind_address" => config.server.bind_address = value.to_string(),
        "server.max_upload_mb" => config.server.max_upload_mb = parse(key, value, INT)?,
        "server.backend" => config.server.backend = value.to_string(),

        // --- storage ---
        "storage.base_path" => config.storage.base_path = PathBuf::from(value),
        "storage.thumbnail_size" => config.storage.thumbnail_size = parse(key, value, INT)?,
        "storage.reconcile_on_startup" => {
            config.storage.reconcile_on_startup = parse(key, value, BOOL)?
        }

        // --- client ---
        "client.server_url" => config.client.server_url = value.to_string(),
        "client.library_root" => config.client.library_root = PathBuf::from(value),
        "client.ledger_path" => config.client.ledger_path = PathBuf::from(value),
        "client.wifi_only" => config.client.wifi_only = parse(key, value, BOOL)?,
        "client.metered" => config.client.metered = parse(key, value, BOOL)?,
        "client.auto_sync" => config.client.auto_sync = parse(key, value, BOOL)?,
        "client.request_timeout_secs" => {
            config.client.request_timeout_secs = parse(key, value, INT)?
        }

        // --- sync ---
        "sync.background_batch_limit" => {
            config.sync.background_batch_limit = parse(key, value, INT)?
        }
        "sync.recent_outcomes_capacity" => {
            config.sync.recent_outcomes_capacity = parse(key, value, INT)?
        }
        "sync.upload_retries" => config.sync.upload_retries = parse(key, value, INT)?,
        "sync.debounce_ms" => config.sync.debounce_ms = parse(key, value, INT)?,

        // --- logging ---
        "logging.level" => config.logging.level = value.to_string(),
        "logging.format" => config.logging.format = value.to_string(),

        _ => bail!("Unknown configuration key: '{key}'"),
    }

    Ok(())
}
