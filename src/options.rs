use std::fmt;

use crate::{rate_limit::RateLimitHook, retry::RetryPolicy, url::DEFAULT_BASE_URL};

/// Default per-request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Client-wide configuration.
///
/// The credential set here may be swapped at runtime through
/// [`crate::SkylarkClient::set_auth`] without rebuilding the client.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the API host.
    pub base_url: String,
    /// Bearer credential, with or without the `Bearer ` prefix.
    pub auth: String,
    /// Default per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Headers sent with every request, after the built-in
    /// `Content-Type` and `Authorization`.
    pub headers: Vec<(String, String)>,
    /// Retry behavior for failed attempts.
    pub retry: RetryPolicy,
    /// Hook awaited before retrying a rate-limited call.
    pub on_rate_limit: Option<RateLimitHook>,
}

impl ClientConfig {
    /// Creates a configuration with defaults for everything but the
    /// credential.
    pub fn new(auth: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            auth: auth.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            headers: Vec::new(),
            retry: RetryPolicy::default(),
            on_rate_limit: None,
        }
    }

    /// Overrides the API host.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the default request timeout.
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Adds a default header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replaces the retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Installs the rate-limit hook.
    pub fn on_rate_limit(mut self, hook: RateLimitHook) -> Self {
        self.on_rate_limit = Some(hook);
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("auth", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .field("headers", &self.headers)
            .field("retry", &self.retry)
            .field("on_rate_limit", &self.on_rate_limit.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{ClientConfig, DEFAULT_TIMEOUT_MS};
    use crate::url::DEFAULT_BASE_URL;

    #[test]
    fn defaults_match_service_contract() {
        let config = ClientConfig::new("token");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.retry.max_retries, 3);
        assert!(config.headers.is_empty());
    }

    #[test]
    fn debug_redacts_credential() {
        let config = ClientConfig::new("secret-token");
        let debug = format!("{config:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }
}
