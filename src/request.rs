use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::{Query, Result, SkylarkError};

/// JSON request body container.
///
/// Serialized once when the call is dispatched and reused unchanged
/// across retry attempts.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    /// No body is sent.
    Empty,
    /// JSON payload.
    Json(JsonValue),
}

impl Body {
    /// Serializes any `Serialize` value into a JSON body.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(|err| SkylarkError::Decode(format!("unserializable request body: {err}")))
    }

    pub(crate) fn as_json(&self) -> Option<&JsonValue> {
        match self {
            Self::Empty => None,
            Self::Json(value) => Some(value),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::Empty
    }
}

impl From<()> for Body {
    fn from(_: ()) -> Self {
        Self::Empty
    }
}

impl From<JsonValue> for Body {
    fn from(value: JsonValue) -> Self {
        Self::Json(value)
    }
}

/// Per-call overrides carried across every retry attempt of one logical
/// call.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    /// Query string appended to the route.
    pub query: Option<Query>,
    /// Extra headers for this call, overriding client defaults on
    /// collision.
    pub headers: Vec<(String, String)>,
    /// Per-call timeout override in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Per-call base URL override.
    pub base_url: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the query string.
    pub fn query(mut self, query: impl Into<Query>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Adds a header for this call only.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Overrides the client timeout for this call.
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Overrides the client base URL for this call.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

impl From<()> for RequestOptions {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl From<Query> for RequestOptions {
    fn from(query: Query) -> Self {
        Self::default().query(query)
    }
}
