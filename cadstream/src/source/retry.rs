//! Retry policy and the retrying source decorator.

use std::time::Duration;

use bytes::Bytes;
use tracing::warn;

use crate::loading::{BoxFuture, FetchError};

use super::ModelSource;

// =============================================================================
// Retry Policy Constants
// =============================================================================

/// Default attempts for source fetches (including the first).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default initial delay for exponential backoff (100ms).
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 100;

/// Default maximum delay for exponential backoff (30 seconds).
pub const DEFAULT_MAX_DELAY_SECS: u64 = 30;

/// Default multiplier for exponential backoff.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// How a fetch handles transient failures.
#[derive(Clone, Debug, PartialEq)]
pub enum RetryPolicy {
    /// No retries - fail immediately on error.
    None,

    /// Fixed number of attempts with constant delay between them.
    Fixed {
        /// Maximum number of attempts (including the initial attempt).
        max_attempts: u32,
        delay: Duration,
    },

    /// Delay grows by `multiplier` after each failure, up to `max_delay`.
    ExponentialBackoff {
        /// Maximum number of attempts (including the initial attempt).
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
    },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetryPolicy {
    /// Exponential backoff starting at 100ms, doubling, capped at 30s.
    pub fn exponential(max_attempts: u32) -> Self {
        Self::ExponentialBackoff {
            max_attempts,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::Fixed { max_attempts, delay }
    }

    /// Exponential backoff with a custom initial delay.
    pub fn with_initial_delay(self, delay: Duration) -> Self {
        match self {
            Self::ExponentialBackoff {
                max_attempts,
                max_delay,
                multiplier,
                ..
            } => Self::ExponentialBackoff {
                max_attempts,
                initial_delay: delay,
                max_delay,
                multiplier,
            },
            Self::Fixed { max_attempts, .. } => Self::Fixed { max_attempts, delay },
            Self::None => Self::None,
        }
    }

    /// Delay before retrying after failed attempt number `attempt` (1-based),
    /// or `None` once the attempts are used up.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Fixed { max_attempts, delay } => (attempt < *max_attempts).then_some(*delay),
            Self::ExponentialBackoff {
                max_attempts,
                initial_delay,
                max_delay,
                multiplier,
            } => {
                if attempt >= *max_attempts {
                    return None;
                }
                let factor = multiplier.powi(attempt.saturating_sub(1) as i32);
                let delay_ms = (initial_delay.as_millis() as f64 * factor).min(max_delay.as_millis() as f64);
                Some(Duration::from_millis(delay_ms as u64).min(*max_delay))
            }
        }
    }

    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::None => 1,
            Self::Fixed { max_attempts, .. } | Self::ExponentialBackoff { max_attempts, .. } => *max_attempts,
        }
    }
}

/// Source decorator that retries transient fetch failures.
///
/// Permanent failures (see [`FetchError::is_permanent`]) are returned
/// immediately.
pub struct RetryingFetcher<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: ModelSource> RetryingFetcher<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn fetch_with_retry(&self, name: &str) -> Result<Bytes, FetchError> {
        let mut attempt = 1;
        loop {
            match self.inner.fetch_file(name).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_permanent() => return Err(e),
                Err(e) => match self.policy.delay_for_attempt(attempt) {
                    Some(delay) => {
                        warn!(
                            file = name,
                            attempt,
                            max_attempts = self.policy.max_attempts(),
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Fetch failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(e),
                },
            }
        }
    }
}

impl<S: ModelSource> ModelSource for RetryingFetcher<S> {
    fn fetch_file<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Bytes, FetchError>> {
        Box::pin(self.fetch_with_retry(name))
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Source returning scripted results in order.
    struct ScriptedSource {
        results: Mutex<VecDeque<Result<Bytes, FetchError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedSource {
        fn new(results: Vec<Result<Bytes, FetchError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                calls: Mutex::new(0),
            }
        }
    }

    impl ModelSource for ScriptedSource {
        fn fetch_file<'a>(&'a self, _name: &'a str) -> BoxFuture<'a, Result<Bytes, FetchError>> {
            *self.calls.lock() += 1;
            let next = self
                .results
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Unavailable("script exhausted".into())));
            Box::pin(async move { next })
        }

        fn describe(&self) -> String {
            "scripted".into()
        }
    }

    fn transient() -> Result<Bytes, FetchError> {
        Err(FetchError::Unavailable("busy".into()))
    }

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::fixed(max_attempts, Duration::from_millis(1))
    }

    #[test]
    fn test_exponential_delays() {
        let policy = RetryPolicy::exponential(4);
        assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_for_attempt(3), Some(Duration::from_millis(400)));
        assert_eq!(policy.delay_for_attempt(4), None);
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy = RetryPolicy::exponential(40);
        assert_eq!(policy.delay_for_attempt(30), Some(Duration::from_secs(DEFAULT_MAX_DELAY_SECS)));
    }

    #[test]
    fn test_none_policy_makes_one_attempt() {
        assert_eq!(RetryPolicy::None.max_attempts(), 1);
        assert_eq!(RetryPolicy::None.delay_for_attempt(1), None);
    }

    #[test]
    fn test_default_policy() {
        assert_eq!(RetryPolicy::default().max_attempts(), DEFAULT_MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let source = ScriptedSource::new(vec![transient(), Ok(Bytes::from_static(b"ok"))]);
        let fetcher = RetryingFetcher::new(source, fast(3));
        assert_eq!(fetcher.fetch_file("a").await.unwrap(), Bytes::from_static(b"ok"));
        assert_eq!(*fetcher.inner().calls.lock(), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let source = ScriptedSource::new(vec![transient(), transient(), transient(), Ok(Bytes::new())]);
        let fetcher = RetryingFetcher::new(source, fast(3));
        assert!(matches!(fetcher.fetch_file("a").await, Err(FetchError::Unavailable(_))));
        assert_eq!(*fetcher.inner().calls.lock(), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let not_found = Err(FetchError::Status {
            url: "http://host/a".into(),
            status: 404,
        });
        let source = ScriptedSource::new(vec![not_found, Ok(Bytes::new())]);
        let fetcher = RetryingFetcher::new(source, fast(3));
        assert!(matches!(fetcher.fetch_file("a").await, Err(FetchError::Status { status: 404, .. })));
        assert_eq!(*fetcher.inner().calls.lock(), 1);
    }
}
