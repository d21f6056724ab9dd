//! HTTP client for catalog pages
//!
//! One request per call: pacing and retries are the retrier's job.

use crate::infrastructure::config::HttpConfig;
use crate::infrastructure::fetcher::{FetchError, PageFetcher};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{redirect, Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, warn};

/// Markers of an anti-bot interstitial instead of the requested page
const CHALLENGE_MARKERS: [&str; 4] = ["Access Denied", "verify you are human", "px-captcha", "Pardon Our Interruption"];

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// reqwest-backed [`PageFetcher`]
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Build the client; failure here is a session setup failure
    pub fn with_config(config: &HttpConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)
                .map_err(|e| FetchError::setup(format!("invalid Accept-Language header: {e}")))?,
        );

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| FetchError::setup(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    fn map_error(url: &str, error: &reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout { url: url.to_string() }
        } else if let Some(status) = error.status() {
            FetchError::Status {
                code: status.as_u16(),
                url: url.to_string(),
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

/// Check a fetched body before handing it to the parsers
pub fn inspect_body(url: &str, body: String) -> Result<String, FetchError> {
    if body.trim().is_empty() {
        return Err(FetchError::EmptyBody { url: url.to_string() });
    }
    if CHALLENGE_MARKERS.iter().any(|marker| body.contains(marker)) {
        return Err(FetchError::Blocked { url: url.to_string() });
    }
    Ok(body)
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::map_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("HTTP {} for {}", status.as_u16(), url);
            return Err(FetchError::Status {
                code: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await.map_err(|e| Self::map_error(url, &e))?;
        debug!("Received {} bytes from {}", body.len(), url);
        inspect_body(url, body)
    }
}
