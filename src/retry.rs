use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use reqwest::{Method, StatusCode};

use crate::Result;

/// Base retry backoff in milliseconds (exponential strategy).
pub const BASE_DELAY_MS: u64 = 300;
/// Upper bound on the exponential component.
pub const MAX_DELAY_MS: u64 = 10_000;
/// Additive jitter as a fraction of the exponential component.
pub const JITTER_FACTOR: f64 = 0.3;

/// Boxed future returned by retry and rate-limit hooks.
pub type HookFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Hook invoked before each retry attempt. An error return aborts the
/// retry sequence and surfaces to the caller.
pub type RetryHook = Arc<dyn Fn(RetryContext) -> HookFuture + Send + Sync>;

/// Replacement delay function, attempt index to milliseconds.
pub type BackoffFn = Arc<dyn Fn(u32) -> u64 + Send + Sync>;

/// Context handed to [`RetryHook`] before a retry is scheduled.
#[derive(Clone, Debug)]
pub struct RetryContext {
    /// HTTP method of the call being retried.
    pub method: Method,
    /// Route as passed to the client, without base URL or version.
    pub route: String,
    /// Zero-based index of the attempt that just failed.
    pub attempt: u32,
    /// Status code of the failed response.
    pub status: u16,
}

/// Configures how failed attempts are re-issued.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Delay function override; the jittered exponential backoff is used
    /// when unset.
    pub backoff: Option<BackoffFn>,
    /// Hook awaited before every retry.
    pub on_retry: Option<RetryHook>,
    /// Whether a timed-out attempt is re-issued like a retryable status.
    /// Off by default: a timeout is a terminal transport error.
    pub retry_on_timeout: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: None,
            on_retry: None,
            retry_on_timeout: false,
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff.as_ref().map(|_| "<fn>"))
            .field("on_retry", &self.on_retry.as_ref().map(|_| "<hook>"))
            .field("retry_on_timeout", &self.retry_on_timeout)
            .finish()
    }
}

impl RetryPolicy {
    /// Disables retries entirely.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Resolves the delay before re-issuing `attempt`, in milliseconds.
    pub(crate) fn delay_ms(&self, attempt: u32) -> u64 {
        match &self.backoff {
            Some(backoff) => backoff(attempt),
            None => backoff_delay_ms(attempt),
        }
    }
}

/// True when `status` is eligible for automatic re-attempt.
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status.as_u16(),
        408 | 425 | 429 | 500 | 502 | 503 | 504
    )
}

/// Computes the jittered exponential backoff for a zero-based attempt
/// index.
///
/// The exponential component is `min(MAX_DELAY_MS, BASE_DELAY_MS <<
/// attempt)`; the jitter adds up to [`JITTER_FACTOR`] of it on top, so the
/// result lies in `[exp, floor(exp * 1.3)]`.
pub fn backoff_delay_ms(attempt: u32) -> u64 {
    let multiplier = 1u64 << attempt.min(16);
    let exp = BASE_DELAY_MS.saturating_mul(multiplier).min(MAX_DELAY_MS);
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    let jitter = (rand::random::<f64>() * exp as f64 * JITTER_FACTOR) as u64;
    exp + jitter
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::{backoff_delay_ms, is_retryable_status, RetryPolicy};

    #[test]
    fn retryable_statuses_match_fixed_set() {
        for code in [408u16, 425, 429, 500, 502, 503, 504] {
            let status = StatusCode::from_u16(code).expect("valid status");
            assert!(is_retryable_status(status), "{code} must be retryable");
        }
        for code in [200u16, 201, 400, 401, 403, 404, 418, 501] {
            let status = StatusCode::from_u16(code).expect("valid status");
            assert!(!is_retryable_status(status), "{code} must be terminal");
        }
    }

    #[test]
    fn backoff_attempt_three_is_bounded() {
        for _ in 0..64 {
            let delay = backoff_delay_ms(3);
            assert!((2400..=3120).contains(&delay), "got {delay}");
        }
    }

    #[test]
    fn backoff_attempt_zero_starts_at_base() {
        for _ in 0..64 {
            let delay = backoff_delay_ms(0);
            assert!((300..=390).contains(&delay), "got {delay}");
        }
    }

    #[test]
    fn backoff_is_capped_for_large_attempts() {
        for attempt in [6u32, 10, 32, u32::MAX] {
            let delay = backoff_delay_ms(attempt);
            assert!((10_000..=13_000).contains(&delay), "got {delay}");
        }
    }

    #[test]
    fn default_policy_allows_three_retries() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert!(!policy.retry_on_timeout);
        assert!(policy.backoff.is_none());
    }

    #[test]
    fn custom_backoff_overrides_default() {
        let policy = RetryPolicy {
            backoff: Some(std::sync::Arc::new(|attempt| u64::from(attempt) * 7)),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_ms(2), 14);
    }
}
