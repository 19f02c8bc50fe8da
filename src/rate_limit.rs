use std::sync::Arc;
use std::time::SystemTime;

use reqwest::header::HeaderMap;

use crate::retry::HookFuture;

/// Status code signaling the caller exceeded the allowed request rate.
pub const RATE_LIMIT_STATUS: u16 = 429;

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const GLOBAL_HEADER: &str = "x-ratelimit-global";
const RETRY_AFTER_MS_HEADER: &str = "retry-after-ms";
const RETRY_AFTER_HEADER: &str = "retry-after";

/// Hook awaited when a 429 response is about to be retried. An error
/// return aborts the retry sequence.
pub type RateLimitHook = Arc<dyn Fn(RateLimitInfo) -> HookFuture + Send + Sync>;

/// Rate-limit metadata parsed from a 429 response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Request ceiling from `x-ratelimit-limit`, 0 when absent or
    /// non-numeric.
    pub limit: u32,
    /// True when `x-ratelimit-global` says the limit spans all routes.
    pub global: bool,
    /// Requested wait in milliseconds, 0 when the service sent none.
    pub retry_after_ms: u64,
}

impl RateLimitInfo {
    /// Extracts rate-limit metadata from response headers.
    ///
    /// `retry-after-ms` wins when present and positive; otherwise the
    /// standard `retry-after` header is read as seconds (ceiling-rounded
    /// to milliseconds) or as an HTTP date (difference from now, floored
    /// at zero).
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            limit: header_str(headers, LIMIT_HEADER)
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(0),
            global: header_str(headers, GLOBAL_HEADER)
                .is_some_and(|value| value.trim().eq_ignore_ascii_case("true")),
            retry_after_ms: parse_retry_after(headers),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn parse_retry_after(headers: &HeaderMap) -> u64 {
    if let Some(ms) = header_str(headers, RETRY_AFTER_MS_HEADER)
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
    {
        return ms;
    }

    let Some(value) = header_str(headers, RETRY_AFTER_HEADER) else {
        return 0;
    };
    let value = value.trim();

    if let Ok(seconds) = value.parse::<f64>() {
        if seconds.is_finite() && seconds > 0.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            return (seconds * 1000.0).ceil() as u64;
        }
        return 0;
    }

    match httpdate::parse_http_date(value) {
        Ok(when) => when
            .duration_since(SystemTime::now())
            .map(|until| u64::try_from(until.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0),
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use reqwest::header::{HeaderMap, HeaderValue};

    use super::RateLimitInfo;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                reqwest::header::HeaderName::from_bytes(name.as_bytes()).expect("valid name"),
                HeaderValue::from_str(value).expect("valid value"),
            );
        }
        map
    }

    #[test]
    fn missing_headers_fall_back_to_zero() {
        let info = RateLimitInfo::from_headers(&HeaderMap::new());
        assert_eq!(info, RateLimitInfo::default());
    }

    #[test]
    fn non_numeric_limit_falls_back_to_zero() {
        let info = RateLimitInfo::from_headers(&headers(&[("x-ratelimit-limit", "soon")]));
        assert_eq!(info.limit, 0);
    }

    #[test]
    fn parses_limit_and_global_flag() {
        let info = RateLimitInfo::from_headers(&headers(&[
            ("x-ratelimit-limit", "120"),
            ("x-ratelimit-global", "TRUE"),
        ]));
        assert_eq!(info.limit, 120);
        assert!(info.global);
    }

    #[test]
    fn global_flag_requires_true() {
        let info = RateLimitInfo::from_headers(&headers(&[("x-ratelimit-global", "1")]));
        assert!(!info.global);
    }

    #[test]
    fn millisecond_header_wins_over_standard() {
        let info = RateLimitInfo::from_headers(&headers(&[
            ("retry-after-ms", "750"),
            ("retry-after", "30"),
        ]));
        assert_eq!(info.retry_after_ms, 750);
    }

    #[test]
    fn zero_millisecond_header_falls_through_to_standard() {
        let info = RateLimitInfo::from_headers(&headers(&[
            ("retry-after-ms", "0"),
            ("retry-after", "2"),
        ]));
        assert_eq!(info.retry_after_ms, 2000);
    }

    #[test]
    fn fractional_seconds_round_up() {
        let info = RateLimitInfo::from_headers(&headers(&[("retry-after", "1.0005")]));
        assert_eq!(info.retry_after_ms, 1001);
    }

    #[test]
    fn http_date_in_the_future_yields_remaining_millis() {
        let when = SystemTime::now() + Duration::from_secs(3);
        let info =
            RateLimitInfo::from_headers(&headers(&[("retry-after", &httpdate::fmt_http_date(when))]));
        assert!(info.retry_after_ms > 0);
        assert!(info.retry_after_ms <= 3000);
    }

    #[test]
    fn http_date_in_the_past_floors_at_zero() {
        let when = SystemTime::now() - Duration::from_secs(30);
        let info =
            RateLimitInfo::from_headers(&headers(&[("retry-after", &httpdate::fmt_http_date(when))]));
        assert_eq!(info.retry_after_ms, 0);
    }

    #[test]
    fn garbage_retry_after_yields_zero() {
        let info = RateLimitInfo::from_headers(&headers(&[("retry-after", "whenever")]));
        assert_eq!(info.retry_after_ms, 0);
    }
}
