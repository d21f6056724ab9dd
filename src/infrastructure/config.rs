//! Configuration infrastructure
//!
//! Configuration is layered, lowest priority first:
//! 1. Built-in defaults ([`AppConfig::default`])
//! 2. The JSON config file (created with defaults on first run)
//! 3. Environment variables, `HARVESTER__<SECTION>__<KEY>`

use crate::infrastructure::export::OutputFormat;
use crate::infrastructure::parsing::SelectorConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::info;
use url::Url;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    FileLoad {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

impl ConfigError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub session: SessionSettings,
    pub http: HttpConfig,
    pub selectors: SelectorConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// What one harvesting run collects and how fast
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionSettings {
    /// First listing page
    pub start_url: String,

    /// Stop once this many records are collected
    pub max_products: usize,

    /// Randomized pause before every fetch, in seconds
    pub delay_min_secs: f64,
    pub delay_max_secs: f64,

    /// Fetch each product's detail page
    pub fetch_details: bool,

    /// Optional hard limit on listing pages
    pub max_pages: Option<u32>,

    /// Attempts per URL, including the first
    pub max_attempts: u32,

    /// Preferred image CDN host
    pub canonical_image_host: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            start_url: defaults::START_URL.to_string(),
            max_products: defaults::MAX_PRODUCTS,
            delay_min_secs: defaults::DELAY_MIN_SECS,
            delay_max_secs: defaults::DELAY_MAX_SECS,
            fetch_details: false,
            max_pages: None,
            max_attempts: defaults::MAX_ATTEMPTS,
            canonical_image_host: defaults::CANONICAL_IMAGE_HOST.to_string(),
        }
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub accept_language: String,
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::REQUEST_TIMEOUT_SECONDS,
            user_agent: defaults::USER_AGENT.to_string(),
            accept_language: defaults::ACCEPT_LANGUAGE.to_string(),
            max_redirects: defaults::MAX_REDIRECTS,
        }
    }
}

/// Output files
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    pub output_dir: PathBuf,

    /// File name without extension
    pub basename: String,

    pub formats: Vec<OutputFormat>,

    /// Append `_YYYYmmdd_HHMMSS` to file names
    pub timestamp_outputs: bool,

    /// Joins list fields inside one CSV cell
    pub list_delimiter: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(defaults::OUTPUT_DIR),
            basename: defaults::OUTPUT_BASENAME.to_string(),
            formats: vec![OutputFormat::Json, OutputFormat::Jsonl, OutputFormat::Csv],
            timestamp_outputs: false,
            list_delimiter: defaults::CSV_LIST_DELIMITER.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted file logs
    pub json_format: bool,

    pub console_output: bool,
    pub file_output: bool,

    /// Log directory; defaults to `logs/` under the data directory
    pub log_dir: Option<PathBuf>,

    pub file_name: String,

    /// Number of log files to keep (older files will be deleted)
    pub max_files: u32,

    /// Enable automatic log cleanup on startup
    pub auto_cleanup_logs: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: true,
            log_dir: None,
            file_name: defaults::LOG_FILE_NAME.to_string(),
            max_files: defaults::MAX_LOG_FILES,
            auto_cleanup_logs: true,
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

impl AppConfig {
    /// Reject settings no session could run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let session = &self.session;

        let start = Url::parse(&session.start_url)
            .map_err(|e| ConfigError::validation(format!("start_url '{}' is not a URL: {}", session.start_url, e)))?;
        if !matches!(start.scheme(), "http" | "https") {
            return Err(ConfigError::validation("start_url must be http or https"));
        }
        if session.max_products == 0 {
            return Err(ConfigError::validation("max_products must be greater than 0"));
        }
        if !session.delay_min_secs.is_finite() || !session.delay_max_secs.is_finite() {
            return Err(ConfigError::validation("delays must be finite numbers"));
        }
        if session.delay_min_secs < 0.0 || session.delay_max_secs < 0.0 {
            return Err(ConfigError::validation("delays cannot be negative"));
        }
        if session.delay_min_secs > session.delay_max_secs {
            return Err(ConfigError::validation("delay_min_secs cannot be greater than delay_max_secs"));
        }
        if session.max_pages == Some(0) {
            return Err(ConfigError::validation("max_pages must be greater than 0 when set"));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::validation("timeout_secs must be greater than 0"));
        }
        if self.output.formats.is_empty() {
            return Err(ConfigError::validation("at least one output format is required"));
        }
        if self.output.basename.trim().is_empty() {
            return Err(ConfigError::validation("output basename cannot be empty"));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::validation(format!("unknown log level '{}'", self.logging.level)));
        }
        if !self.logging.console_output && !self.logging.file_output {
            return Err(ConfigError::validation("no logging output configured"));
        }

        Ok(())
    }
}

/// Loads, creates and saves the configuration file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
    env_prefix: String,
    env_source: Option<config::Map<String, String>>,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Get application data directory
    pub fn get_app_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to get user data directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(data_dir)
    }

    /// Configuration manager for the default location
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        Ok(Self::with_path(config_dir.join(defaults::CONFIG_FILE_NAME)))
    }

    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            env_prefix: defaults::ENV_PREFIX.to_string(),
            env_source: None,
        }
    }

    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Read environment overrides from `source` instead of the process
    #[must_use]
    pub fn with_env_source(mut self, source: config::Map<String, String>) -> Self {
        self.env_source = Some(source);
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Create the config directory and a default file when missing, then load
    pub async fn initialize_on_first_run(&self) -> Result<AppConfig> {
        let config_dir = self.config_path.parent().context("Failed to get config directory")?;

        if !config_dir.as_os_str().is_empty() && !config_dir.exists() {
            fs::create_dir_all(config_dir)
                .await
                .context("Failed to create config directory")?;
            info!("Created configuration directory: {:?}", config_dir);
        }

        if !self.config_path.exists() {
            info!("First run detected - writing default configuration to {:?}", self.config_path);
            self.save_config(&AppConfig::default()).await?;
        }

        self.load().context("Failed to load configuration")
    }

    /// Merge defaults, file and environment, then validate
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let environment = config::Environment::with_prefix(&self.env_prefix)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .source(self.env_source.clone());

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::from(self.config_path.as_path()).format(config::FileFormat::Json).required(false))
            .add_source(environment)
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        info!("Loaded configuration from: {:?}", self.config_path);
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        let content = serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .with_context(|| format!("Failed to write configuration file: {:?}", self.config_path))?;

        info!("Configuration saved to: {:?}", self.config_path);
        Ok(())
    }
}

/// Default configuration values
pub mod defaults {
    pub const APP_DIR_NAME: &str = "catalog-harvester";
    pub const CONFIG_FILE_NAME: &str = "config.json";
    pub const ENV_PREFIX: &str = "HARVESTER";

    /// Default first listing page
    pub const START_URL: &str = "https://www.target.com/c/handbags-purses-accessories/-/N-5xtbo";

    pub const MAX_PRODUCTS: usize = 100;

    /// Pacing bounds in seconds
    pub const DELAY_MIN_SECS: f64 = 1.0;
    pub const DELAY_MAX_SECS: f64 = 3.0;

    /// Attempts per URL, including the first
    pub const MAX_ATTEMPTS: u32 = 3;
    pub const MAX_ATTEMPTS_CEILING: u32 = 5;

    /// Products per listing page; also the offset step
    pub const DEFAULT_PAGE_SIZE: u32 = 24;

    pub const CANONICAL_IMAGE_HOST: &str = "target.scene7.com";

    /// Default request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
    pub const MAX_REDIRECTS: usize = 10;
    pub const USER_AGENT: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
    pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

    pub const OUTPUT_DIR: &str = "output";
    pub const OUTPUT_BASENAME: &str = "products";
    pub const CSV_LIST_DELIMITER: &str = "|";

    pub const LOG_FILE_NAME: &str = "catalog-harvester.log";
    pub const MAX_LOG_FILES: u32 = 10;
}
