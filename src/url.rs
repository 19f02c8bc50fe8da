use url::form_urlencoded;

/// Production API host used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.skylark.dev";

/// Fixed API version path segment.
pub const API_VERSION: &str = "v1";

/// Query string container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Query {
    /// Key/value pairs, encoded in insertion order.
    Pairs(Vec<(String, String)>),
    /// Pre-encoded query string, appended verbatim.
    Raw(String),
}

impl Query {
    /// Builds a query from key/value pairs.
    pub fn pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Pairs(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Builds a query from an already-encoded string.
    ///
    /// A leading `?` is stripped; the rest is used as-is and never
    /// re-encoded.
    pub fn raw(encoded: impl Into<String>) -> Self {
        let encoded = encoded.into();
        let trimmed = encoded.strip_prefix('?').map(str::to_owned);
        Self::Raw(trimmed.unwrap_or(encoded))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Pairs(pairs) => pairs.is_empty(),
            Self::Raw(encoded) => encoded.is_empty(),
        }
    }

    fn encode(&self) -> String {
        match self {
            Self::Pairs(pairs) => form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs.iter().map(|(key, value)| (key, value)))
                .finish(),
            Self::Raw(encoded) => encoded.clone(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for Query {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Self::pairs(pairs)
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Query {
    fn from(pairs: [(K, V); N]) -> Self {
        Self::pairs(pairs)
    }
}

/// Composes the full request URL from base, version segment, route, and
/// optional query.
///
/// Example: `build_url("https://api.skylark.dev", "/flights", None)` →
/// `"https://api.skylark.dev/v1/flights"`
pub(crate) fn build_url(base_url: &str, route: &str, query: Option<&Query>) -> String {
    let base = base_url.trim_end_matches('/');
    let mut url = if route.starts_with('/') {
        format!("{base}/{API_VERSION}{route}")
    } else {
        format!("{base}/{API_VERSION}/{route}")
    };

    if let Some(query) = query.filter(|query| !query.is_empty()) {
        url.push('?');
        url.push_str(&query.encode());
    }

    url
}
