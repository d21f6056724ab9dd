//! Page fetching seam
//!
//! The session only ever sees [`PageFetcher`]. The HTTP client implements it
//! for real runs; tests plug in in-memory fakes.

use async_trait::async_trait;
use thiserror::Error;

/// Transport failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("HTTP {code} from {url}")]
    Status { code: u16, url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Empty response body from {url}")]
    EmptyBody { url: String },

    #[error("Bot challenge served for {url}")]
    Blocked { url: String },

    /// The transport could not be set up at all
    #[error("Transport setup failed: {message}")]
    Setup { message: String },

    /// Retries exhausted or a permanent failure; stops pagination, not the run
    #[error("Page unavailable after {attempts} attempt(s): {url} ({last_error})")]
    PageUnavailable {
        url: String,
        attempts: u32,
        last_error: String,
    },
}

impl FetchError {
    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup {
            message: message.into(),
        }
    }

    /// Whether another attempt could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } | Self::EmptyBody { .. } | Self::Blocked { .. } => true,
            Self::Status { code, .. } => matches!(code, 403 | 408 | 429 | 500..=599),
            Self::Setup { .. } | Self::PageUnavailable { .. } => false,
        }
    }

    pub fn is_setup_failure(&self) -> bool {
        matches!(self, Self::Setup { .. })
    }
}

/// Source of raw page content
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one URL once; pacing and retries live in the caller
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}
