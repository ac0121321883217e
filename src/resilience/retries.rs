//! Retry policy for the reverse-proxy transport.
//!
//! # Design Decisions
//! - Only transport failures (connect errors, timeouts) are retried; a
//!   response with any HTTP status is final
//! - Every verb is retried the same way, writes included
//! - The policy is process-wide and immutable once built

use std::time::Duration;

use crate::config::ProxyConfig;
use crate::resilience::backoff::calculate_backoff;

/// Upper bound on a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Retry and timeout settings shared by every proxied call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Backoff base factor in seconds.
    pub backoff_base_secs: f64,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ProxyConfig::default())
    }
}

impl From<&ProxyConfig> for RetryPolicy {
    fn from(config: &ProxyConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base_secs: config.backoff_base_secs,
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            read_timeout: Duration::from_millis(config.read_timeout_ms),
        }
    }
}

impl RetryPolicy {
    /// Total attempts including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Sleep before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        calculate_backoff(retry, self.backoff_base_secs, MAX_BACKOFF)
    }

    /// Longest a single send can take: every attempt runs to its read
    /// timeout and every backoff is slept.
    pub fn worst_case_duration(&self) -> Duration {
        let attempts = self.read_timeout.saturating_mul(self.max_attempts());
        (1..=self.max_retries).fold(attempts, |total, retry| {
            total.saturating_add(self.backoff(retry))
        })
    }
}

/// Whether a failed send is worth another attempt.
pub fn is_retryable(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout() || error.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 4);
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.connect_timeout, Duration::from_millis(500));
        assert_eq!(policy.read_timeout, Duration::from_secs(30));
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(4), Duration::from_millis(800));
    }

    #[test]
    fn test_worst_case_covers_every_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.worst_case_duration(), Duration::from_millis(151_500));

        let policy = RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.worst_case_duration(), Duration::from_secs(30));
    }
}
