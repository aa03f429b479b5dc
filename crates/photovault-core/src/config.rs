//! Configuration module for PhotoVault.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//! The server and the client share one document; each reads only its sections.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable that overrides `storage.base_path`.
pub const STORAGE_PATH_ENV: &str = "PHOTO_STORAGE_PATH";

// ---------------------------------------------------------------------------
// T010: Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for PhotoVault.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub client: ClientConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on, e.g. `0.0.0.0:8080`.
    pub bind_address: String,
    /// Upper bound on a multipart upload body (in MiB).
    pub max_upload_mb: u64,
    /// Metadata backend: `json` or `sqlite`.
    pub backend: String,
}

/// Server-side storage layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of originals, thumbnails and metadata.
    pub base_path: PathBuf,
    /// Longest edge of generated thumbnails (in pixels).
    pub thumbnail_size: u32,
    /// Sweep orphaned files before accepting requests.
    pub reconcile_on_startup: bool,
}

/// Client-side settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the backup server.
    pub server_url: String,
    /// Folder treated as the local photo library.
    pub library_root: PathBuf,
    /// Location of the upload ledger.
    pub ledger_path: PathBuf,
    /// Only sync over unmetered links.
    pub wifi_only: bool,
    /// Treat the current link as metered.
    pub metered: bool,
    /// React to library changes without an explicit trigger.
    pub auto_sync: bool,
    /// Per-request timeout (in seconds).
    pub request_timeout_secs: u64,
}

/// Sync engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum uploads per background pass.
    pub background_batch_limit: usize,
    /// How many recent outcomes to keep for display.
    pub recent_outcomes_capacity: usize,
    /// Attempts per upload on transient failures.
    pub upload_retries: u32,
    /// Quiet period before library changes are handled (in milliseconds).
    pub debounce_ms: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `pretty` or `json`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// T011: Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/photovault/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("photovault")
            .join("config.yaml")
    }

    /// Apply environment overrides on top of file values.
    pub fn apply_env_overrides(&mut self) {
        if let Some(path) = std::env::var_os(STORAGE_PATH_ENV) {
            if !path.is_empty() {
                self.storage.base_path = PathBuf::from(path);
            }
        }
    }

    /// Serialize back to YAML (used by `config init` / `config show`).
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl StorageConfig {
    /// Directory holding original files, sharded by `YYYY/MM`.
    pub fn originals_dir(&self) -> PathBuf {
        self.base_path.join("photos").join("originals")
    }

    /// Directory holding generated thumbnails.
    pub fn thumbnails_dir(&self) -> PathBuf {
        self.base_path.join("thumbnails")
    }

    /// File used by the JSON metadata backend.
    pub fn metadata_file(&self) -> PathBuf {
        self.base_path.join("metadata.json")
    }

    /// Database used by the SQLite metadata backend.
    pub fn database_file(&self) -> PathBuf {
        self.base_path.join("photovault.db")
    }
}

// ---------------------------------------------------------------------------
// T012: Defaults
// ---------------------------------------------------------------------------

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_upload_mb: 50,
            backend: "json".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("/app/data"),
            thumbnail_size: 300,
            reconcile_on_startup: true,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("photovault");
        Self {
            server_url: "http://192.168.1.1:8080".to_string(),
            library_root: dirs::picture_dir().unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("~"))
                    .join("Pictures")
            }),
            ledger_path: data_dir.join("ledger.json"),
            wifi_only: false,
            metered: false,
            auto_sync: true,
            request_timeout_secs: 60,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            background_batch_limit: 50,
            recent_outcomes_capacity: 50,
            upload_retries: 3,
            debounce_ms: 500,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// T013: Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"server.max_upload_mb"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["pretty", "json"];

/// Valid values for `server.backend`.
pub const VALID_BACKENDS: &[&str] = &["json", "sqlite"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- server ---
        if self
            .server
            .bind_address
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            errors.push(ValidationError::new(
                "server.bind_address",
                format!("not a socket address: {}", self.server.bind_address),
            ));
        }
        if self.server.max_upload_mb == 0 {
            errors.push(ValidationError::new(
                "server.max_upload_mb",
                "must be greater than 0",
            ));
        }
        if !VALID_BACKENDS.contains(&self.server.backend.as_str()) {
            errors.push(ValidationError::new(
                "server.backend",
                format!(
                    "invalid backend '{}', expected one of: {}",
                    self.server.backend,
                    VALID_BACKENDS.join(", ")
                ),
            ));
        }

        // --- storage ---
        if self.storage.base_path.as_os_str().is_empty() {
            errors.push(ValidationError::new("storage.base_path", "must not be empty"));
        }
        if !(16..=2048).contains(&self.storage.thumbnail_size) {
            errors.push(ValidationError::new(
                "storage.thumbnail_size",
                "must be between 16 and 2048",
            ));
        }

        // --- client ---
        let url = self.client.server_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ValidationError::new(
                "client.server_url",
                "must start with http:// or https://",
            ));
        }
        if self.client.request_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "client.request_timeout_secs",
                "must be greater than 0",
            ));
        }

        // --- sync ---
        if self.sync.background_batch_limit == 0 {
            errors.push(ValidationError::new(
                "sync.background_batch_limit",
                "must be greater than 0",
            ));
        }
        if self.sync.recent_outcomes_capacity == 0 {
            errors.push(ValidationError::new(
                "sync.recent_outcomes_capacity",
                "must be greater than 0",
            ));
        }
        if self.sync.upload_retries == 0 {
            errors.push(ValidationError::new(
                "sync.upload_retries",
                "must be at least 1",
            ));
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError::new(
                "logging.level",
                format!(
                    "invalid log level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(ValidationError::new(
                "logging.format",
                format!(
                    "invalid log format '{}', expected one of: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            ));
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// T014: ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for [`Config`], starting from defaults.
///
/// ```
/// use photovault_core::config::ConfigBuilder;
///
/// let cfg = ConfigBuilder::new()
///     .storage_base_path("/srv/photos".into())
///     .server_backend("sqlite")
///     .build();
/// assert_eq!(cfg.server.backend, "sqlite");
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder pre-populated with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- server ---

    pub fn server_bind_address(mut self, addr: impl Into<String>) -> Self {
        self.config.server.bind_address = addr.into();
        self
    }

    pub fn server_max_upload_mb(mut self, mb: u64) -> Self {
        self.config.server.max_upload_mb = mb;
        self
    }

    pub fn server_backend(mut self, backend: impl Into<String>) -> Self {
        self.config.server.backend = backend.into();
        self
    }

    // --- storage ---

    pub fn storage_base_path(mut self, path: PathBuf) -> Self {
        self.config.storage.base_path = path;
        self
    }

    pub fn storage_thumbnail_size(mut self, size: u32) -> Self {
        self.config.storage.thumbnail_size = size;
        self
    }

    pub fn storage_reconcile_on_startup(mut self, enabled: bool) -> Self {
        self.config.storage.reconcile_on_startup = enabled;
        self
    }

    // --- client ---

    pub fn client_server_url(mut self, url: impl Into<String>) -> Self {
        self.config.client.server_url = url.into();
        self
    }

    pub fn client_library_root(mut self, root: PathBuf) -> Self {
        self.config.client.library_root = root;
        self
    }

    pub fn client_ledger_path(mut self, path: PathBuf) -> Self {
        self.config.client.ledger_path = path;
        self
    }

    pub fn client_wifi_only(mut self, wifi_only: bool) -> Self {
        self.config.client.wifi_only = wifi_only;
        self
    }

    pub fn client_auto_sync(mut self, auto_sync: bool) -> Self {
        self.config.client.auto_sync = auto_sync;
        self
    }

    // --- sync ---

    pub fn sync_background_batch_limit(mut self, limit: usize) -> Self {
        self.config.sync.background_batch_limit = limit;
        self
    }

    pub fn sync_upload_retries(mut self, retries: u32) -> Self {
        self.config.sync.upload_retries = retries;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// T015: Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert_eq!(cfg.server.bind_address, "0.0.0.0:8080");
        assert_eq!(cfg.server.max_upload_mb, 50);
        assert_eq!(cfg.server.backend, "json");
        assert_eq!(cfg.storage.base_path, PathBuf::from("/app/data"));
        assert_eq!(cfg.storage.thumbnail_size, 300);
        assert!(cfg.storage.reconcile_on_startup);
        assert_eq!(cfg.client.server_url, "http://192.168.1.1:8080");
        assert!(cfg.client.ledger_path.ends_with("photovault/ledger.json"));
        assert!(!cfg.client.wifi_only);
        assert!(cfg.client.auto_sync);
        assert_eq!(cfg.client.request_timeout_secs, 60);
        assert_eq!(cfg.sync.background_batch_limit, 50);
        assert_eq!(cfg.sync.recent_outcomes_capacity, 50);
        assert_eq!(cfg.sync.upload_retries, 3);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.format, "pretty");
    }

    #[test]
    fn default_config_passes_validation() {
        let errors = Config::default().validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    #[test]
    fn derived_storage_paths() {
        let storage = StorageConfig {
            base_path: PathBuf::from("/data"),
            ..StorageConfig::default()
        };
        assert_eq!(storage.originals_dir(), PathBuf::from("/data/photos/originals"));
        assert_eq!(storage.thumbnails_dir(), PathBuf::from("/data/thumbnails"));
        assert_eq!(storage.metadata_file(), PathBuf::from("/data/metadata.json"));
        assert_eq!(storage.database_file(), PathBuf::from("/data/photovault.db"));
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
server:
  bind_address: 127.0.0.1:9000
  max_upload_mb: 20
  backend: sqlite
storage:
  base_path: /srv/photos
  thumbnail_size: 256
  reconcile_on_startup: false
client:
  server_url: http://nas.local:8080
  library_root: /tmp/pics
  ledger_path: /tmp/ledger.json
  wifi_only: true
  metered: true
  auto_sync: false
  request_timeout_secs: 30
sync:
  background_batch_limit: 10
  recent_outcomes_capacity: 20
  upload_retries: 5
  debounce_ms: 1000
logging:
  level: debug
  format: json
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.server.bind_address, "127.0.0.1:9000");
        assert_eq!(cfg.server.max_upload_mb, 20);
        assert_eq!(cfg.server.backend, "sqlite");
        assert_eq!(cfg.storage.base_path, PathBuf::from("/srv/photos"));
        assert_eq!(cfg.storage.thumbnail_size, 256);
        assert!(!cfg.storage.reconcile_on_startup);
        assert_eq!(cfg.client.server_url, "http://nas.local:8080");
        assert_eq!(cfg.client.library_root, PathBuf::from("/tmp/pics"));
        assert!(cfg.client.wifi_only);
        assert!(cfg.client.metered);
        assert!(!cfg.client.auto_sync);
        assert_eq!(cfg.sync.background_batch_limit, 10);
        assert_eq!(cfg.sync.upload_retries, 5);
        assert_eq!(cfg.sync.debounce_ms, 1000);
        assert_eq!(cfg.logging.format, "json");
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"server:\n  backend: sqlite\n").unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.server.backend, "sqlite");
        assert_eq!(cfg.server.max_upload_mb, 50);
        assert_eq!(cfg.storage.thumbnail_size, 300);
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg.server.backend, "json");
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"not: [valid: yaml: {{{").unwrap();
        tmp.flush().unwrap();

        assert!(Config::load(tmp.path()).is_err());
    }

    #[test]
    fn yaml_round_trip_preserves_values() {
        let cfg = ConfigBuilder::new().server_backend("sqlite").build();
        let yaml = cfg.to_yaml().unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.server.backend, "sqlite");
    }

    // -- Validation --

    #[test]
    fn validate_catches_bad_bind_address() {
        let mut cfg = Config::default();
        cfg.server.bind_address = "not-an-address".into();
        assert!(cfg
            .validate()
            .iter()
            .any(|e| e.field == "server.bind_address"));
    }

    #[test]
    fn validate_catches_unknown_backend() {
        let mut cfg = Config::default();
        cfg.server.backend = "postgres".into();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "server.backend"));
    }

    #[test]
    fn validate_catches_zero_values() {
        let mut cfg = Config::default();
        cfg.server.max_upload_mb = 0;
        cfg.client.request_timeout_secs = 0;
        cfg.sync.background_batch_limit = 0;
        cfg.sync.recent_outcomes_capacity = 0;
        cfg.sync.upload_retries = 0;
        let fields: Vec<_> = cfg.validate().into_iter().map(|e| e.field).collect();
        for expected in [
            "server.max_upload_mb",
            "client.request_timeout_secs",
            "sync.background_batch_limit",
            "sync.recent_outcomes_capacity",
            "sync.upload_retries",
        ] {
            assert!(fields.iter().any(|f| f == expected), "missing {expected}");
        }
    }

    #[test]
    fn validate_catches_thumbnail_size_out_of_range() {
        let mut cfg = Config::default();
        cfg.storage.thumbnail_size = 4;
        assert!(cfg
            .validate()
            .iter()
            .any(|e| e.field == "storage.thumbnail_size"));
    }

    #[test]
    fn validate_catches_server_url_without_scheme() {
        let mut cfg = Config::default();
        cfg.client.server_url = "192.168.1.1:8080".into();
        assert!(cfg
            .validate()
            .iter()
            .any(|e| e.field == "client.server_url"));
    }

    #[test]
    fn validate_catches_invalid_logging() {
        let mut cfg = Config::default();
        cfg.logging.level = "verbose".into();
        cfg.logging.format = "xml".into();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "logging.level"));
        assert!(errors.iter().any(|e| e.field == "logging.format"));
    }

    #[test]
    fn validate_accepts_all_valid_log_levels() {
        for level in VALID_LOG_LEVELS {
            let mut cfg = Config::default();
            cfg.logging.level = level.to_string();
            assert!(
                !cfg.validate().iter().any(|e| e.field == "logging.level"),
                "level '{level}' should be valid"
            );
        }
    }

    // -- Builder --

    #[test]
    fn builder_starts_from_defaults() {
        let cfg = ConfigBuilder::new().build();
        assert_eq!(cfg.server.bind_address, "0.0.0.0:8080");
        assert_eq!(cfg.sync.background_batch_limit, 50);
    }

    #[test]
    fn builder_overrides_fields() {
        let cfg = ConfigBuilder::new()
            .server_bind_address("127.0.0.1:3000")
            .server_max_upload_mb(10)
            .storage_base_path(PathBuf::from("/srv"))
            .storage_thumbnail_size(128)
            .storage_reconcile_on_startup(false)
            .client_server_url("https://photos.example")
            .client_wifi_only(true)
            .client_auto_sync(false)
            .sync_background_batch_limit(5)
            .sync_upload_retries(1)
            .logging_level("warn")
            .logging_format("json")
            .build();
        assert_eq!(cfg.server.bind_address, "127.0.0.1:3000");
        assert_eq!(cfg.server.max_upload_mb, 10);
        assert_eq!(cfg.storage.base_path, PathBuf::from("/srv"));
        assert_eq!(cfg.storage.thumbnail_size, 128);
        assert!(!cfg.storage.reconcile_on_startup);
        assert_eq!(cfg.client.server_url, "https://photos.example");
        assert!(cfg.client.wifi_only);
        assert!(!cfg.client.auto_sync);
        assert_eq!(cfg.sync.background_batch_limit, 5);
        assert_eq!(cfg.sync.upload_retries, 1);
        assert_eq!(cfg.logging.level, "warn");
        assert_eq!(cfg.logging.format, "json");
    }

    #[test]
    fn builder_build_validated_fails_for_invalid_config() {
        let result = ConfigBuilder::new().server_backend("mongo").build_validated();
        let errors = result.unwrap_err();
        assert!(errors.iter().any(|e| e.field == "server.backend"));
    }

    #[test]
    fn default_path_ends_with_config_yaml() {
        let path = Config::default_path();
        assert!(path.ends_with("photovault/config.yaml"));
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError::new("server.backend", "bad");
        assert_eq!(err.to_string(), "server.backend: bad");
    }
}
