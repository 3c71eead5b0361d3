//! Configuration management for askstore.
//!
//! This module handles loading and merging configuration from multiple sources,
//! lowest precedence first:
//! - Built-in defaults
//! - Config file (`.askstore/config.yaml` in the workspace)
//! - `.env` file in the workspace
//! - Environment variables
//! - Command-line flags

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Default base URL of the remote store and generation APIs.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default base URL for multipart uploads.
pub const DEFAULT_UPLOAD_BASE_URL: &str = "https://generativelanguage.googleapis.com/upload/v1beta";

/// Default generation model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .askstore/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// API key for the remote store and generation service
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Resource name of the file search store (e.g. "fileSearchStores/abc")
    pub store_name: Option<String>,

    /// Base URL for store and generation calls
    pub base_url: String,

    /// Base URL for uploads
    pub upload_base_url: String,

    /// Default generation model identifier
    pub model: String,

    /// Retrieval fan-out settings
    pub retrieval: RetrievalSettings,

    /// Generation call settings
    pub generation: GenerationSettings,

    /// HTTP server settings
    pub server: ServerSettings,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Settings for the retrieval fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalSettings {
    /// Fragments requested when the caller gives no count
    pub results_count: u32,

    /// Upper bound on concurrent per-document queries
    pub max_concurrency: usize,

    /// Timeout for each store call, in seconds
    pub timeout_secs: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            results_count: 10,
            max_concurrency: 8,
            timeout_secs: 30,
        }
    }
}

/// Settings for the generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationSettings {
    /// Timeout for each generation attempt, in seconds
    pub timeout_secs: u64,

    /// Total attempts when rate limited (first call included)
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds; doubles on each retry
    pub initial_backoff_ms: u64,

    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_attempts: 3,
            initial_backoff_ms: 1000,
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 2048,
        }
    }
}

/// Settings for `askstore serve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address to bind
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Configuration without secrets, safe to hand to clients.
#[derive(Debug, Clone, Serialize)]
pub struct PublicConfig {
    pub store_name: Option<String>,
    pub api_configured: bool,
    pub model: String,
    pub results_count: u32,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    store: Option<StoreSection>,
    generation: Option<GenerationSection>,
    retrieval: Option<RetrievalSettings>,
    server: Option<ServerSettings>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreSection {
    name: Option<String>,
    base_url: Option<String>,
    upload_base_url: Option<String>,
    #[serde(rename = "apiKeyEnv")]
    api_key_env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GenerationSection {
    model: Option<String>,
    #[serde(flatten)]
    settings: GenerationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            api_key: None,
            store_name: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            upload_base_url: DEFAULT_UPLOAD_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            retrieval: RetrievalSettings::default(),
            generation: GenerationSettings::default(),
            server: ServerSettings::default(),
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from files, environment variables and defaults.
    ///
    /// Environment variables:
    /// - `ASKSTORE_WORKSPACE`: Override workspace path
    /// - `ASKSTORE_CONFIG`: Path to config file
    /// - `GEMINI_API_KEY`: API key
    /// - `FILE_SEARCH_STORE_NAME`: Store resource name
    /// - `ASKSTORE_MODEL`: Default model identifier
    /// - `ASKSTORE_BASE_URL`: API base URL
    /// - `ASKSTORE_BIND`: Server bind address
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use askstore_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Store: {:?}", config.store_name);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Load configuration with an explicit workspace and/or config file.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("ASKSTORE_WORKSPACE")) {
            config.workspace = workspace;
        }
        config.config_file = config_file.or_else(|| env_path("ASKSTORE_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.askstore_dir().join("config.yaml"));

        let mut api_key_env = None;
        if config_path.exists() {
            let file = read_config_file(&config_path)?;
            api_key_env = file
                .store
                .as_ref()
                .and_then(|store| store.api_key_env.clone());
            config.merge_file(file);
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // .env never overrides variables already set in the process
        let dotenv_path = config.workspace.join(".env");
        if dotenv_path.exists() {
            dotenvy::from_path(&dotenv_path).map_err(|e| {
                AppError::Config(format!("Failed to read {:?}: {}", dotenv_path, e))
            })?;
        }

        config.merge_env(api_key_env.as_deref());

        Ok(config)
    }

    /// Merge a parsed config file into this config.
    fn merge_file(&mut self, file: ConfigFile) {
        if let Some(store) = file.store {
            if let Some(name) = store.name {
                self.store_name = Some(name);
            }
            if let Some(base_url) = store.base_url {
                self.base_url = base_url;
            }
            if let Some(upload_base_url) = store.upload_base_url {
                self.upload_base_url = upload_base_url;
            }
        }

        if let Some(generation) = file.generation {
            if let Some(model) = generation.model {
                self.model = model;
            }
            self.generation = generation.settings;
        }

        if let Some(retrieval) = file.retrieval {
            self.retrieval = retrieval;
        }

        if let Some(server) = file.server {
            self.server = server;
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
        }
    }

    /// Environment variables override the config file.
    fn merge_env(&mut self, api_key_env: Option<&str>) {
        let key_var = api_key_env.unwrap_or("GEMINI_API_KEY");
        if let Ok(key) = std::env::var(key_var) {
            self.api_key = Some(key);
        }

        if let Ok(store) = std::env::var("FILE_SEARCH_STORE_NAME") {
            self.store_name = Some(store);
        }

        if let Ok(model) = std::env::var("ASKSTORE_MODEL") {
            self.model = model;
        }

        if let Ok(base_url) = std::env::var("ASKSTORE_BASE_URL") {
            self.base_url = base_url;
        }

        if let Ok(bind) = std::env::var("ASKSTORE_BIND") {
            self.server.bind = bind;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over everything else.
    pub fn with_overrides(
        mut self,
        store: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(store) = store {
            self.store_name = Some(store);
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .askstore directory.
    pub fn askstore_dir(&self) -> PathBuf {
        self.workspace.join(".askstore")
    }

    /// API key, or a configuration error naming the variable to set.
    pub fn require_api_key(&self) -> AppResult<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AppError::Config("GEMINI_API_KEY is not configured".to_string()))
    }

    /// Store name, or a configuration error naming the variable to set.
    pub fn require_store_name(&self) -> AppResult<&str> {
        self.store_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("FILE_SEARCH_STORE_NAME is not configured".to_string())
            })
    }

    /// Validate that the remote services can be reached with this configuration.
    pub fn validate(&self) -> AppResult<()> {
        self.require_api_key()?;
        let store = self.require_store_name()?;

        if self.retrieval.max_concurrency == 0 {
            return Err(AppError::Config(
                "retrieval.maxConcurrency must be at least 1".to_string(),
            ));
        }

        if self.retrieval.results_count == 0 || self.retrieval.results_count > 100 {
            return Err(AppError::Config(
                "retrieval.resultsCount must be between 1 and 100".to_string(),
            ));
        }

        if self.generation.max_attempts == 0 {
            return Err(AppError::Config(
                "generation.maxAttempts must be at least 1".to_string(),
            ));
        }

        tracing::info!("Configuration valid. Store: {}", store);
        Ok(())
    }

    /// Configuration as exposed to clients, without the API key.
    pub fn public_view(&self) -> PublicConfig {
        PublicConfig {
            store_name: self.store_name.clone(),
            api_configured: self.api_key.is_some(),
            model: self.model.clone(),
            results_count: self.retrieval.results_count,
        }
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var(var).ok().map(PathBuf::from)
}

fn read_config_file(path: &Path) -> AppResult<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("Failed to read config file {:?}: {}", path, e)))?;

    serde_yaml::from_str(&contents)
        .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn configured() -> AppConfig {
        AppConfig {
            api_key: Some("key".to_string()),
            store_name: Some("fileSearchStores/test".to_string()),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.model, "gemini-2.5-flash-lite");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.retrieval.results_count, 10);
        assert_eq!(config.generation.timeout_secs, 60);
        assert_eq!(config.generation.max_attempts, 3);
        assert!(!config.verbose);
        assert!(!config.no_color);
    }

    #[test]
    fn test_askstore_dir() {
        let config = AppConfig::default();
        assert!(config.askstore_dir().ends_with(".askstore"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            Some("fileSearchStores/other".to_string()),
            Some("gemini-2.5-pro".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(
            overridden.store_name.as_deref(),
            Some("fileSearchStores/other")
        );
        assert_eq!(overridden.model, "gemini-2.5-pro");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
store:
  name: fileSearchStores/from-file
  baseUrl: http://localhost:9000/v1beta
generation:
  model: gemini-2.5-flash
retrieval:
  resultsCount: 20
  maxConcurrency: 4
  timeoutSecs: 10
server:
  bind: 127.0.0.1:8080
logging:
  level: warn
  color: false
"#
        )
        .unwrap();

        let parsed = read_config_file(file.path()).unwrap();
        let mut config = AppConfig::default();
        config.merge_file(parsed);

        assert_eq!(
            config.store_name.as_deref(),
            Some("fileSearchStores/from-file")
        );
        assert_eq!(config.base_url, "http://localhost:9000/v1beta");
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.retrieval.results_count, 20);
        assert_eq!(config.retrieval.max_concurrency, 4);
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.log_level.as_deref(), Some("warn"));
        assert!(config.no_color);
        // Untouched sections keep their defaults
        assert_eq!(config.generation.max_attempts, 3);
    }

    #[test]
    fn test_malformed_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "store: [unclosed").unwrap();
        assert!(matches!(
            read_config_file(file.path()),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_missing_workspace() {
        let result = AppConfig::load_with(Some(PathBuf::from("/definitely/not/here")), None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_requires_key_and_store() {
        assert!(configured().validate().is_ok());

        let mut no_key = configured();
        no_key.api_key = None;
        assert!(no_key.validate().is_err());

        let mut blank_store = configured();
        blank_store.store_name = Some("  ".to_string());
        assert!(blank_store.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = configured();
        config.retrieval.max_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_public_view_hides_key() {
        let view = configured().public_view();
        assert!(view.api_configured);
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("\"key\""));
    }
}
