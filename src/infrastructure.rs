//! Infrastructure layer for HTTP transport, HTML parsing, configuration,
//! logging and output files

pub mod config;
pub mod export;
pub mod fetcher;
pub mod logging;
pub mod parsing;
pub mod parsing_error;
pub mod retry_manager;
pub mod simple_http_client;

pub use config::{AppConfig, ConfigError, ConfigManager};
pub use export::{ExportError, OutputFormat, OutputWriter};
pub use fetcher::{FetchError, PageFetcher};
pub use logging::{get_log_directory, init_logging_with_config, log_system_info};
pub use parsing::{ParsingError, ParsingResult, ProductDetailParser, ProductListParser, SelectorConfig};
pub use retry_manager::{PacedRetrier, RetryPolicy};
pub use simple_http_client::HttpClient;
