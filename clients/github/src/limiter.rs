use reqwest::header::HeaderMap;
use std::str::FromStr;

/// Quota state derived from one response's headers. Never persisted; only
/// used to compute how long a rate-limited call must wait.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub remaining: Option<u32>,
    pub reset_at: Option<i64>,
}

impl RateLimitSnapshot {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        RateLimitSnapshot {
            remaining: read_header(headers, "x-ratelimit-remaining"),
            reset_at: read_header(headers, "x-ratelimit-reset"),
        }
    }

    /// A 403 with an exhausted quota is a scheduled wait, not a failure.
    pub fn exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

fn read_header<T: FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn parses_both_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000060"));
        let snapshot = RateLimitSnapshot::from_headers(&headers);
        assert!(snapshot.exhausted());
        assert_eq!(snapshot.reset_at, Some(1_700_000_060));
    }

    #[test]
    fn missing_or_garbage_headers_parse_as_none() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("soon"));
        let snapshot = RateLimitSnapshot::from_headers(&headers);
        assert_eq!(snapshot.remaining, None);
        assert_eq!(snapshot.reset_at, None);
        assert!(!snapshot.exhausted());
    }
}
