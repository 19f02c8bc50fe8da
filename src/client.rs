use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

// tokio::time::sleep is only available on non-WASM targets.
#[cfg(not(target_arch = "wasm32"))]
use tokio::time::sleep;

use crate::{
    rate_limit::{RateLimitInfo, RATE_LIMIT_STATUS},
    retry::{is_retryable_status, RetryContext},
    url::build_url,
    wire::{ApiResponse, ErrorBody},
    Body, ClientConfig, RequestOptions, Result, SkylarkError,
};

#[derive(Clone)]
/// HTTP client for the Skylark REST API.
///
/// Cheap to clone; clones share the credential, so
/// [`SkylarkClient::set_auth`] on any handle affects subsequent calls on
/// all of them. Calls already in flight keep the header snapshot taken at
/// dispatch.
pub struct SkylarkClient {
    http: reqwest::Client,
    config: ClientConfig,
    auth: Arc<RwLock<String>>,
}

impl fmt::Debug for SkylarkClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkylarkClient")
            .field("config", &self.config)
            .field("auth", &"<redacted>")
            .finish()
    }
}

impl SkylarkClient {
    /// Creates a client from a bearer credential with default
    /// configuration.
    ///
    /// If the credential is missing the `Bearer ` prefix, it is added
    /// automatically at dispatch time.
    pub fn new(auth: impl Into<String>) -> Self {
        Self::with_config(ClientConfig::new(auth))
    }

    /// Creates a client from a full configuration.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use skylark_http::{ClientConfig, RetryPolicy, SkylarkClient};
    ///
    /// let api = SkylarkClient::with_config(
    ///     ClientConfig::new("my-token")
    ///         .base_url("https://staging.skylark.dev")
    ///         .retry(RetryPolicy { max_retries: 5, ..RetryPolicy::default() }),
    /// );
    /// ```
    pub fn with_config(mut config: ClientConfig) -> Self {
        let auth = std::mem::take(&mut config.auth);
        Self {
            http: reqwest::Client::new(),
            config,
            auth: Arc::new(RwLock::new(auth)),
        }
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `SKYLARK_TOKEN` — bearer credential (prefix optional)
    /// - `SKYLARK_BASE_URL` — optional host override
    ///
    /// Returns an error if the token is missing or empty.
    ///
    /// **Not available on `wasm32` targets** — environment variables do not
    /// exist in browser runtimes. Use [`SkylarkClient::new`] and pass the
    /// credential in from JavaScript.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> std::result::Result<Self, String> {
        let token = std::env::var("SKYLARK_TOKEN")
            .map_err(|_| "missing SKYLARK_TOKEN environment variable".to_owned())?;
        if token.trim().is_empty() {
            return Err("SKYLARK_TOKEN is set but empty".to_owned());
        }
        let mut config = ClientConfig::new(token);
        if let Ok(base_url) = std::env::var("SKYLARK_BASE_URL") {
            if !base_url.trim().is_empty() {
                config = config.base_url(base_url);
            }
        }
        Ok(Self::with_config(config))
    }

    /// Replaces the credential used by subsequent calls.
    ///
    /// Returns `&self` for chaining. Calls already in flight are
    /// unaffected.
    pub fn set_auth(&self, auth: impl Into<String>) -> &Self {
        let mut guard = self
            .auth
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = auth.into();
        self
    }

    /// Issues a `GET` and decodes the `data` payload.
    pub async fn get<T: DeserializeOwned>(
        &self,
        route: &str,
        options: impl Into<RequestOptions>,
    ) -> Result<T> {
        self.request(Method::GET, route, Body::Empty, options.into())
            .await
    }

    /// Issues a `POST` with an optional JSON body.
    ///
    /// Pass `()` for no body, a `serde_json::Value`, or
    /// [`Body::json`] for any serializable payload.
    pub async fn post<T: DeserializeOwned>(
        &self,
        route: &str,
        body: impl Into<Body>,
        options: impl Into<RequestOptions>,
    ) -> Result<T> {
        self.request(Method::POST, route, body.into(), options.into())
            .await
    }

    /// Issues a `PUT` with an optional JSON body.
    pub async fn put<T: DeserializeOwned>(
        &self,
        route: &str,
        body: impl Into<Body>,
        options: impl Into<RequestOptions>,
    ) -> Result<T> {
        self.request(Method::PUT, route, body.into(), options.into())
            .await
    }

    /// Issues a `PATCH` with an optional JSON body.
    pub async fn patch<T: DeserializeOwned>(
        &self,
        route: &str,
        body: impl Into<Body>,
        options: impl Into<RequestOptions>,
    ) -> Result<T> {
        self.request(Method::PATCH, route, body.into(), options.into())
            .await
    }

    /// Issues a `DELETE` and decodes the `data` payload.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        route: &str,
        options: impl Into<RequestOptions>,
    ) -> Result<T> {
        self.request(Method::DELETE, route, Body::Empty, options.into())
            .await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        route: &str,
        body: Body,
        options: RequestOptions,
    ) -> Result<T> {
        let data = self.send_with_retry(method, route, body, options).await?;
        serde_json::from_value(data)
            .map_err(|err| SkylarkError::Decode(format!("invalid response payload: {err}")))
    }

    /// Runs one logical call as a chain of physical attempts.
    ///
    /// The URL, headers, body, and timeout are captured once here and
    /// reused unchanged by every attempt.
    async fn send_with_retry(
        &self,
        method: Method,
        route: &str,
        body: Body,
        options: RequestOptions,
    ) -> Result<JsonValue> {
        let base_url = options
            .base_url
            .as_deref()
            .unwrap_or(&self.config.base_url);
        let url = build_url(base_url, route, options.query.as_ref());
        let timeout = Duration::from_millis(options.timeout_ms.unwrap_or(self.config.timeout_ms));
        let headers = self.header_snapshot(&options)?;

        let mut attempt = 0u32;
        loop {
            // Build the request. On WASM, reqwest uses AbortController for
            // timeout; the `.timeout()` method is available on both targets.
            let mut builder = self
                .http
                .request(method.clone(), &url)
                .headers(headers.clone())
                .timeout(timeout);
            if let Some(json) = body.as_json() {
                builder = builder.json(json);
            }
            let response = builder.send().await;

            match response {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let text = response.text().await.map_err(SkylarkError::Transport)?;
                        let parsed: ApiResponse = serde_json::from_str(&text).map_err(|err| {
                            SkylarkError::Decode(format!(
                                "invalid response envelope: {err}; body: {text}"
                            ))
                        })?;
                        return Ok(parsed.data);
                    }

                    let rate_limit = (status.as_u16() == RATE_LIMIT_STATUS)
                        .then(|| RateLimitInfo::from_headers(response.headers()));

                    if !is_retryable_status(status) {
                        let text = response.text().await.map_err(SkylarkError::Transport)?;
                        return Err(terminal_error(&method, &url, status, &text));
                    }

                    if attempt >= self.config.retry.max_retries {
                        let text = response.text().await.map_err(SkylarkError::Transport)?;
                        return Err(exhausted_error(&method, &url, status, &text, rate_limit));
                    }

                    if let Some(info) = &rate_limit {
                        if let Some(hook) = &self.config.on_rate_limit {
                            hook(info.clone()).await?;
                        }
                    }
                    if let Some(hook) = &self.config.retry.on_retry {
                        hook(RetryContext {
                            method: method.clone(),
                            route: route.to_owned(),
                            attempt,
                            status: status.as_u16(),
                        })
                        .await?;
                    }

                    let retry_after_ms = rate_limit
                        .map(|info| info.retry_after_ms)
                        .unwrap_or(0);
                    let delay_ms = if retry_after_ms > 0 {
                        retry_after_ms
                    } else {
                        self.config.retry.delay_ms(attempt)
                    };

                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        "retrying {} {} after {} ms (status {})",
                        method,
                        url,
                        delay_ms,
                        status.as_u16()
                    );

                    wait_before_retry(delay_ms).await;
                    attempt += 1;
                }
                Err(err) => {
                    if self.should_retry_transport(&err)
                        && attempt < self.config.retry.max_retries
                    {
                        let delay_ms = self.config.retry.delay_ms(attempt);

                        #[cfg(feature = "tracing")]
                        tracing::debug!(
                            "retrying {} {} after {} ms (transport: {})",
                            method,
                            url,
                            delay_ms,
                            err
                        );

                        wait_before_retry(delay_ms).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(SkylarkError::Transport(err));
                }
            }
        }
    }

    /// Captures the headers for one logical call: built-in content type
    /// and authorization first, then client defaults, then per-call
    /// overrides. Later entries replace earlier ones of the same name.
    fn header_snapshot(&self, options: &RequestOptions) -> Result<HeaderMap> {
        let auth = self
            .auth
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let authorization = normalize_bearer_authorization(&auth);
        headers.insert(
            reqwest::header::AUTHORIZATION,
            HeaderValue::from_str(&authorization)
                .map_err(|err| SkylarkError::Decode(format!("invalid credential: {err}")))?,
        );

        for (name, value) in self.config.headers.iter().chain(options.headers.iter()) {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| SkylarkError::Decode(format!("invalid header name '{name}': {err}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|err| SkylarkError::Decode(format!("invalid header value: {err}")))?;
            headers.insert(name, value);
        }

        Ok(headers)
    }

    fn should_retry_transport(&self, err: &reqwest::Error) -> bool {
        if err.is_timeout() {
            return self.config.retry.retry_on_timeout;
        }
        err.is_request()
            || err.is_body()
            // is_connect() is not available on wasm32 targets (no TCP)
            || {
                #[cfg(not(target_arch = "wasm32"))]
                { err.is_connect() }
                #[cfg(target_arch = "wasm32")]
                { false }
            }
    }
}

fn status_reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("unknown status")
}

/// Maps a non-retryable response to the error taxonomy: a body carrying
/// an application-level payload becomes a business error, anything else a
/// protocol error.
fn terminal_error(method: &Method, url: &str, status: StatusCode, text: &str) -> SkylarkError {
    let body = ErrorBody::parse(text);
    let fallback = status_reason(status);
    let message = body.message_or(fallback);
    match body.business_parts() {
        Some((message, code, detail)) => SkylarkError::Business {
            message,
            code,
            detail,
        },
        None => SkylarkError::Api {
            status: status.as_u16(),
            method: method.clone(),
            url: url.to_owned(),
            message,
        },
    }
}

/// Maps retry exhaustion on a retryable status to the error taxonomy,
/// rate-limit-specific when 429 context was parsed.
fn exhausted_error(
    method: &Method,
    url: &str,
    status: StatusCode,
    text: &str,
    rate_limit: Option<RateLimitInfo>,
) -> SkylarkError {
    let message = ErrorBody::parse(text).message_or(status_reason(status));
    match rate_limit {
        Some(info) => SkylarkError::RateLimited {
            status: status.as_u16(),
            method: method.clone(),
            url: url.to_owned(),
            message,
            limit: info.limit,
            global: info.global,
            retry_after_ms: info.retry_after_ms,
        },
        None => SkylarkError::Api {
            status: status.as_u16(),
            method: method.clone(),
            url: url.to_owned(),
            message,
        },
    }
}

/// Waits before the next retry attempt.
///
/// On native targets: sleep via `tokio::time::sleep`. On WASM targets:
/// no-op — edge functions prefer fast failure over sleeping, and
/// `tokio::time::sleep` is not available.
async fn wait_before_retry(delay_ms: u64) {
    #[cfg(not(target_arch = "wasm32"))]
    sleep(Duration::from_millis(delay_ms)).await;

    // WASM: no sleep implementation — suppress unused variable warning.
    #[cfg(target_arch = "wasm32")]
    let _ = delay_ms;
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_bearer_authorization, terminal_error, SkylarkClient};
    use crate::{RequestOptions, SkylarkError};
    use reqwest::{Method, StatusCode};
    use serde_json::json;

    #[test]
    fn normalize_bearer_adds_prefix_when_missing() {
        assert_eq!(
            normalize_bearer_authorization("abc123"),
            "Bearer abc123".to_owned()
        );
    }

    #[test]
    fn normalize_bearer_keeps_existing_prefix() {
        assert_eq!(
            normalize_bearer_authorization("bEaReR abc123"),
            "bEaReR abc123".to_owned()
        );
    }

    #[test]
    fn debug_redacts_authorization_value() {
        let api = SkylarkClient::new("secret-token");
        let debug = format!("{api:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn snapshot_reflects_set_auth() {
        let api = SkylarkClient::new("first");
        let before = api
            .header_snapshot(&RequestOptions::default())
            .expect("must build headers");
        assert_eq!(
            before.get(reqwest::header::AUTHORIZATION).unwrap(),
            "Bearer first"
        );

        api.set_auth("second");
        let after = api
            .header_snapshot(&RequestOptions::default())
            .expect("must build headers");
        assert_eq!(
            after.get(reqwest::header::AUTHORIZATION).unwrap(),
            "Bearer second"
        );
    }

    #[test]
    fn per_call_headers_override_defaults() {
        let api = SkylarkClient::with_config(
            crate::ClientConfig::new("token").header("x-trace", "default"),
        );
        let options = RequestOptions::new().header("x-trace", "override");
        let headers = api.header_snapshot(&options).expect("must build headers");
        assert_eq!(headers.get("x-trace").unwrap(), "override");
    }

    #[test]
    fn terminal_error_prefers_business_payload() {
        let text = json!({
            "error": {"message": "bad name", "code": "invalid_field", "detail": {"field": "name"}}
        })
        .to_string();
        let err = terminal_error(
            &Method::POST,
            "https://api.skylark.dev/v1/flights",
            StatusCode::BAD_REQUEST,
            &text,
        );
        match err {
            SkylarkError::Business { code, detail, .. } => {
                assert_eq!(code, "invalid_field");
                assert_eq!(detail, json!({"field": "name"}));
            }
            other => panic!("expected business error, got {other:?}"),
        }
    }

    #[test]
    fn terminal_error_without_payload_is_api_error() {
        let err = terminal_error(
            &Method::GET,
            "https://api.skylark.dev/v1/flights",
            StatusCode::NOT_FOUND,
            "",
        );
        match err {
            SkylarkError::Api { status, message, .. } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Not Found");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }
}
