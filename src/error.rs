use reqwest::Method;
use serde_json::Value as JsonValue;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum SkylarkError {
    /// Network or request execution error from `reqwest`, including
    /// per-attempt timeouts.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Non-success HTTP response that is not retryable, or a retryable
    /// status whose retry budget was exhausted.
    #[error("api error {status} on {method} {url}: {message}")]
    Api {
        /// HTTP status code of the final response.
        status: u16,
        /// HTTP method of the failed call.
        method: Method,
        /// Full request URL.
        url: String,
        /// Error message from the response body, or the canonical status
        /// reason when the body carried none.
        message: String,
    },
    /// Retry budget exhausted on a 429 response. Carries the rate-limit
    /// context parsed from the final response headers.
    #[error("rate limited on {method} {url}: {message} (retry after {retry_after_ms} ms)")]
    RateLimited {
        /// HTTP status code (always 429).
        status: u16,
        /// HTTP method of the failed call.
        method: Method,
        /// Full request URL.
        url: String,
        /// Error message from the response body or status reason.
        message: String,
        /// Request ceiling reported by the service, 0 when absent.
        limit: u32,
        /// Whether the limit applies across all routes.
        global: bool,
        /// Server-requested wait before the next request, in milliseconds.
        retry_after_ms: u64,
    },
    /// Application-level failure reported in the response body of a
    /// terminal response, independent of HTTP status semantics.
    #[error("business error {code}: {message}")]
    Business {
        /// Human-readable failure description.
        message: String,
        /// Machine-readable failure code.
        code: String,
        /// Structured failure detail, `null` when the service sent none.
        detail: JsonValue,
    },
    /// Response decoding or envelope-shape validation error.
    #[error("decode error: {0}")]
    Decode(String),
}

impl SkylarkError {
    /// Returns the HTTP status of the final response, if this error
    /// carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::RateLimited { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// True if the underlying attempt failed by exceeding its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_timeout())
    }

    /// Returns the rate-limit context when the call was rejected for
    /// exceeding the allowed request rate.
    pub fn rate_limit(&self) -> Option<(u32, bool, u64)> {
        match self {
            Self::RateLimited {
                limit,
                global,
                retry_after_ms,
                ..
            } => Some((*limit, *global, *retry_after_ms)),
            _ => None,
        }
    }
}
