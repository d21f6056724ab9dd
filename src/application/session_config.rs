use crate::infrastructure::config::{defaults, AppConfig, ConfigError};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Immutable settings for one harvesting session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    start_url: String,
    max_products: usize,
    delay_min: Duration,
    delay_max: Duration,
    fetch_details: bool,
    output_dir: PathBuf,
    max_pages: Option<u32>,
    max_attempts: u32,
    timestamp_outputs: bool,
    canonical_image_host: String,
    page_size: u32,
}

impl SessionConfig {
    /// Defaults for everything but the start page
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            max_products: defaults::MAX_PRODUCTS,
            delay_min: Duration::from_secs_f64(defaults::DELAY_MIN_SECS),
            delay_max: Duration::from_secs_f64(defaults::DELAY_MAX_SECS),
            fetch_details: false,
            output_dir: PathBuf::from(defaults::OUTPUT_DIR),
            max_pages: None,
            max_attempts: defaults::MAX_ATTEMPTS,
            timestamp_outputs: false,
            canonical_image_host: defaults::CANONICAL_IMAGE_HOST.to_string(),
            page_size: defaults::DEFAULT_PAGE_SIZE,
        }
    }

    /// Validate the loaded configuration and clamp it into a session config
    pub fn from_app_config(app_config: &AppConfig) -> Result<Self, ConfigError> {
        app_config.validate()?;
        let session = &app_config.session;

        Ok(Self {
            start_url: session.start_url.clone(),
            max_products: session.max_products,
            delay_min: Duration::from_secs_f64(session.delay_min_secs),
            delay_max: Duration::from_secs_f64(session.delay_max_secs),
            fetch_details: session.fetch_details,
            output_dir: app_config.output.output_dir.clone(),
            max_pages: session.max_pages,
            max_attempts: session.max_attempts.clamp(1, defaults::MAX_ATTEMPTS_CEILING),
            timestamp_outputs: app_config.output.timestamp_outputs,
            canonical_image_host: session.canonical_image_host.clone(),
            page_size: app_config.selectors.listing.page_size.max(1),
        })
    }

    #[must_use]
    pub fn with_max_products(mut self, max_products: usize) -> Self {
        self.max_products = max_products;
        self
    }

    /// Pacing bounds; swapped if given in the wrong order
    #[must_use]
    pub fn with_delays(mut self, delay_min: Duration, delay_max: Duration) -> Self {
        self.delay_min = delay_min.min(delay_max);
        self.delay_max = delay_max.max(delay_min);
        self
    }

    #[must_use]
    pub fn with_fetch_details(mut self, fetch_details: bool) -> Self {
        self.fetch_details = fetch_details;
        self
    }

    #[must_use]
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.clamp(1, defaults::MAX_ATTEMPTS_CEILING);
        self
    }

    #[must_use]
    pub fn with_timestamp_outputs(mut self, timestamp_outputs: bool) -> Self {
        self.timestamp_outputs = timestamp_outputs;
        self
    }

    #[must_use]
    pub fn with_canonical_image_host(mut self, host: impl Into<String>) -> Self {
        self.canonical_image_host = host.into();
        self
    }

    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    pub fn max_products(&self) -> usize {
        self.max_products
    }

    pub fn delay_min(&self) -> Duration {
        self.delay_min
    }

    pub fn delay_max(&self) -> Duration {
        self.delay_max
    }

    pub fn fetch_details(&self) -> bool {
        self.fetch_details
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn max_pages(&self) -> Option<u32> {
        self.max_pages
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn timestamp_outputs(&self) -> bool {
        self.timestamp_outputs
    }

    pub fn canonical_image_host(&self) -> &str {
        &self.canonical_image_host
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}
