//! `skylark-http` is an async HTTP client for the Skylark REST API.
//!
//! The crate wraps the versioned REST endpoints with ergonomic methods:
//! - [`SkylarkClient::get`]
//! - [`SkylarkClient::post`]
//! - [`SkylarkClient::put`]
//! - [`SkylarkClient::patch`]
//! - [`SkylarkClient::delete`]
//!
//! Failed attempts on retryable statuses are re-issued with jittered
//! exponential backoff; 429 responses honor the server's retry-after
//! headers and can be observed through the
//! [`ClientConfig::on_rate_limit`] hook.

mod client;
mod error;
mod options;
mod rate_limit;
mod request;
mod retry;
mod url;
mod wire;

pub use client::SkylarkClient;
pub use error::SkylarkError;
pub use options::{ClientConfig, DEFAULT_TIMEOUT_MS};
pub use rate_limit::{RateLimitHook, RateLimitInfo, RATE_LIMIT_STATUS};
pub use request::{Body, RequestOptions};
pub use retry::{
    backoff_delay_ms, is_retryable_status, BackoffFn, HookFuture, RetryContext, RetryHook,
    RetryPolicy,
};
pub use url::{Query, DEFAULT_BASE_URL};

pub type Result<T> = std::result::Result<T, SkylarkError>;
