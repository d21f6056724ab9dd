//! Pacing and bounded retries around every fetch
//!
//! Each attempt, the first included, is preceded by a random pause drawn
//! uniformly from `[delay_min, delay_max]`. Transient failures are retried
//! up to `max_attempts`; anything else that is not a setup failure becomes
//! [`FetchError::PageUnavailable`] straight away.

use crate::infrastructure::fetcher::{FetchError, PageFetcher};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Pacing and retry bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    delay_min: Duration,
    delay_max: Duration,
    max_attempts: u32,
}

impl RetryPolicy {
    /// Bounds are normalised: `delay_max >= delay_min`, at least one attempt
    pub fn new(delay_min: Duration, delay_max: Duration, max_attempts: u32) -> Self {
        Self {
            delay_min,
            delay_max: delay_max.max(delay_min),
            max_attempts: max_attempts.max(1),
        }
    }

    /// No pauses; for tests and local fixtures
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, max_attempts)
    }

    pub fn delay_min(&self) -> Duration {
        self.delay_min
    }

    pub fn delay_max(&self) -> Duration {
        self.delay_max
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Uniform draw from `[delay_min, delay_max]`
    pub fn next_delay(&self) -> Duration {
        let spread = self.delay_max.saturating_sub(self.delay_min);
        self.delay_min + spread.mul_f64(fastrand::f64())
    }
}

/// Decides whether a failed attempt is worth repeating
pub trait FailureClassifier: Send + Sync {
    fn should_retry(&self, error: &FetchError, attempt: u32, max_attempts: u32) -> bool;
}

/// Retries transient failures while attempts remain
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardFailureClassifier;

impl FailureClassifier for StandardFailureClassifier {
    fn should_retry(&self, error: &FetchError, attempt: u32, max_attempts: u32) -> bool {
        error.is_transient() && attempt < max_attempts
    }
}

/// Paced, retrying front for a [`PageFetcher`]
pub struct PacedRetrier {
    policy: RetryPolicy,
    fetcher: Arc<dyn PageFetcher>,
    classifier: Arc<dyn FailureClassifier>,
}

impl PacedRetrier {
    pub fn new(policy: RetryPolicy, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            policy,
            fetcher,
            classifier: Arc::new(StandardFailureClassifier),
        }
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch `url`. Errors are either `Setup` (fatal) or `PageUnavailable`.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let max_attempts = self.policy.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let delay = self.policy.next_delay();
            if !delay.is_zero() {
                debug!("Waiting {:?} before attempt {} for {}", delay, attempt, url);
                tokio::time::sleep(delay).await;
            }

            let error = match self.fetcher.fetch_page(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_setup_failure() => return Err(e),
                Err(e) => e,
            };

            if self.classifier.should_retry(&error, attempt, max_attempts) {
                warn!("Attempt {}/{} for {} failed: {}; retrying", attempt, max_attempts, url, error);
                continue;
            }

            warn!("Giving up on {} after {} attempt(s): {}", url, attempt, error);
            return Err(FetchError::PageUnavailable {
                url: url.to_string(),
                attempts: attempt,
                last_error: error.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted results and counts calls
    struct Scripted {
        results: Mutex<VecDeque<Result<String, FetchError>>>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(results: Vec<Result<String, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl PageFetcher for Scripted {
        async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
            *self.calls.lock().unwrap() += 1;
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Timeout { url: url.to_string() }))
        }
    }

    fn timeout() -> Result<String, FetchError> {
        Err(FetchError::Timeout {
            url: "u".to_string(),
        })
    }

    #[tokio::test]
    async fn test_transient_failure_then_success() {
        let fetcher = Scripted::new(vec![timeout(), Ok("<html></html>".to_string())]);
        let retrier = PacedRetrier::new(RetryPolicy::immediate(3), fetcher.clone());

        assert_eq!(retrier.fetch("u").await.unwrap(), "<html></html>");
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries_become_page_unavailable() {
        let fetcher = Scripted::new(vec![timeout(), timeout(), timeout(), Ok("late".to_string())]);
        let retrier = PacedRetrier::new(RetryPolicy::immediate(3), fetcher.clone());

        let error = retrier.fetch("u").await.unwrap_err();
        assert!(matches!(error, FetchError::PageUnavailable { attempts: 3, .. }));
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let fetcher = Scripted::new(vec![Err(FetchError::Status {
            code: 404,
            url: "u".to_string(),
        })]);
        let retrier = PacedRetrier::new(RetryPolicy::immediate(3), fetcher.clone());

        assert!(matches!(retrier.fetch("u").await, Err(FetchError::PageUnavailable { attempts: 1, .. })));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_setup_failure_passes_through() {
        let fetcher = Scripted::new(vec![Err(FetchError::setup("no transport"))]);
        let retrier = PacedRetrier::new(RetryPolicy::immediate(3), fetcher);

        assert!(matches!(retrier.fetch("u").await, Err(FetchError::Setup { .. })));
    }

    /// Gives up on rate limiting straight away
    struct NoRetryOnRateLimit;

    impl FailureClassifier for NoRetryOnRateLimit {
        fn should_retry(&self, error: &FetchError, attempt: u32, max_attempts: u32) -> bool {
            !matches!(error, FetchError::Status { code: 429, .. }) && error.is_transient() && attempt < max_attempts
        }
    }

    #[tokio::test]
    async fn test_custom_classifier_decides_retries() {
        let rate_limited = Err(FetchError::Status {
            code: 429,
            url: "u".to_string(),
        });
        let fetcher = Scripted::new(vec![rate_limited, Ok("ok".to_string())]);
        let retrier = PacedRetrier::new(RetryPolicy::immediate(3), fetcher.clone()).with_classifier(Arc::new(NoRetryOnRateLimit));

        assert!(matches!(retrier.fetch("u").await, Err(FetchError::PageUnavailable { attempts: 1, .. })));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_attempt_is_paced() {
        let fetcher = Scripted::new(vec![timeout(), Ok("ok".to_string())]);
        let policy = RetryPolicy::new(Duration::from_secs(2), Duration::from_secs(2), 3);
        let retrier = PacedRetrier::new(policy, fetcher);

        let started = tokio::time::Instant::now();
        retrier.fetch("u").await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(4) && elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_delay_stays_within_bounds() {
        let policy = RetryPolicy::new(Duration::from_millis(500), Duration::from_millis(900), 2);
        for _ in 0..200 {
            let delay = policy.next_delay();
            assert!(delay >= policy.delay_min() && delay <= policy.delay_max());
        }
    }

    #[test]
    fn test_policy_normalises_bounds() {
        let policy = RetryPolicy::new(Duration::from_secs(3), Duration::from_secs(1), 0);
        assert_eq!(policy.delay_max(), Duration::from_secs(3));
        assert_eq!(policy.max_attempts(), 1);
    }
}
