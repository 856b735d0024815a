//! Cached, retrying, rate-limit-aware request executor. One logical fetch
//! runs: cache lookup -> HTTP call -> response classification -> retry
//! state machine -> write-through cache. Transient failures retry without
//! bound; only auth rejection, cancellation, or an unrecognized status
//! surfaces to the caller.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use devrank::api::{Error, Result};
use log::{debug, info, warn};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::sync::Mutex;
use url::Url;

use crate::cache::{self, ResponseCache};
use crate::limiter::RateLimitSnapshot;
use crate::retry::{Backoff, RetryState, Setback, Step};
use crate::stats::{self, CallStats, EndpointStats};

pub struct Gateway {
    http: Mutex<reqwest::Client>,
    headers: HeaderMap,
    timeout: Duration,
    cache: Mutex<ResponseCache>,
    cache_dir: Option<PathBuf>,
    stats: Mutex<CallStats>,
    backoff: Backoff,
    shutdown: Option<watch::Receiver<bool>>,
}

/// Terminal result of one logical fetch, before deserialization.
struct Fetched {
    body: String,
    /// 202: the upstream is still computing; success with no payload to
    /// parse as data, and never cached.
    accepted: bool,
}

/// Classification of a single attempt.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Success { accepted: bool, body: String },
    Setback(Setback),
    AuthRejected,
    ListTooLarge,
    Terminal { status: u16 },
}

impl Gateway {
    pub(crate) fn new(
        headers: HeaderMap,
        timeout: Duration,
        cache: ResponseCache,
        cache_dir: Option<PathBuf>,
        backoff: Backoff,
        shutdown: Option<watch::Receiver<bool>>,
    ) -> Result<Self> {
        let http = build_http_client(&headers, timeout)?;
        Ok(Gateway {
            http: Mutex::new(http),
            headers,
            timeout,
            cache: Mutex::new(cache),
            cache_dir,
            stats: Mutex::new(CallStats::default()),
            backoff,
            shutdown,
        })
    }

    /// Fetches a single JSON object.
    pub async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let fetched = self.execute(url).await?;
        serde_json::from_str(&fetched.body).map_err(|err| Error::Payload(err.to_string()))
    }

    /// Fetches a JSON collection, normalizing the shapes the upstream
    /// legitimately returns while data is being computed: `{}`, `[]`, a
    /// bare object where an array belongs, and `202 Accepted` all resolve
    /// to an empty collection.
    pub async fn fetch_list<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let fetched = self.execute(url).await?;
        if fetched.accepted {
            return Ok(Vec::new());
        }
        normalize_list(&fetched.body)
    }

    async fn execute(&self, url: &str) -> Result<Fetched> {
        let parsed = Url::parse(url)
            .map_err(|err| Error::Payload(format!("invalid request URL {}: {}", url, err)))?;
        let endpoint = stats::endpoint_template(&parsed);
        let cacheable = cache::is_cacheable(&parsed);
        let key = cache::cache_key(&parsed);

        if cacheable {
            if let Some(body) = self.cache.lock().await.lookup(&key, Utc::now().timestamp()) {
                debug!("Cache hit: {}", key);
                self.stats.lock().await.record_cache_hit(&endpoint);
                return Ok(Fetched { body, accepted: false });
            }
        }

        let mut state = RetryState::default();
        let started = Instant::now();
        loop {
            match self.attempt(url).await {
                Outcome::Success { accepted, body } => {
                    self.stats.lock().await.record_call(
                        &endpoint,
                        started.elapsed(),
                        state.total_retries(),
                        true,
                    );
                    if cacheable && !accepted {
                        self.cache
                            .lock()
                            .await
                            .store(key, body.clone(), Utc::now().timestamp());
                    }
                    return Ok(Fetched { body, accepted });
                }
                Outcome::AuthRejected => {
                    self.record_failure(&endpoint, started, &state).await;
                    return Err(Error::AuthRejected);
                }
                Outcome::ListTooLarge => {
                    self.record_failure(&endpoint, started, &state).await;
                    return Err(Error::ContributorListTooLarge);
                }
                Outcome::Terminal { status } => {
                    self.record_failure(&endpoint, started, &state).await;
                    return Err(Error::Status {
                        status,
                        endpoint: endpoint.clone(),
                    });
                }
                Outcome::Setback(setback) => {
                    let step = state.next(setback, &self.backoff, Utc::now().timestamp());
                    match step {
                        Step::Wait(delay) => {
                            info!("{}: {:?}, retrying in {:?}", endpoint, setback, delay);
                            self.wait(delay).await?;
                        }
                        Step::RebuildClientAndWait(delay) => {
                            warn!("{}: rebuilding HTTP client, pausing {:?}", endpoint, delay);
                            self.rebuild_client().await?;
                            self.wait(delay).await?;
                        }
                    }
                }
            }
        }
    }

    async fn attempt(&self, url: &str) -> Outcome {
        let client = self.http.lock().await.clone();
        let response = match client.get(url).send().await {
            Ok(response) => response,
            Err(err) => {
                debug!("Transport failure for {}: {}", url, err);
                return Outcome::Setback(Setback::Transient { empty_body: false });
            }
        };
        let status = response.status();
        let limits = RateLimitSnapshot::from_headers(response.headers());
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                debug!("Body read failure for {}: {}", url, err);
                return Outcome::Setback(Setback::Transient { empty_body: false });
            }
        };
        classify(status, limits, body)
    }

    async fn record_failure(&self, endpoint: &str, started: Instant, state: &RetryState) {
        self.stats
            .lock()
            .await
            .record_call(endpoint, started.elapsed(), state.total_retries(), false);
    }

    /// Backoff sleep, interruptible by the shutdown signal.
    async fn wait(&self, delay: Duration) -> Result<()> {
        let receiver = match &self.shutdown {
            None => {
                tokio::time::sleep(delay).await;
                return Ok(());
            }
            Some(receiver) => receiver,
        };
        let mut receiver = receiver.clone();
        if *receiver.borrow() {
            return Err(Error::Cancelled);
        }
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return Ok(()),
                changed = receiver.changed() => {
                    if changed.is_err() {
                        // Sender dropped without signalling; finish the
                        // remaining wait.
                        (&mut sleep).await;
                        return Ok(());
                    }
                    if *receiver.borrow() {
                        return Err(Error::Cancelled);
                    }
                }
            }
        }
    }

    async fn rebuild_client(&self) -> Result<()> {
        let rebuilt = build_http_client(&self.headers, self.timeout)?;
        *self.http.lock().await = rebuilt;
        Ok(())
    }

    pub async fn save_cache(&self) -> Result<()> {
        if let Some(dir) = &self.cache_dir {
            self.cache.lock().await.save(dir)?;
        }
        Ok(())
    }

    pub async fn log_stats(&self) {
        self.stats.lock().await.log_summary();
    }

    pub async fn endpoint_stats(&self, endpoint: &str) -> Option<EndpointStats> {
        self.stats.lock().await.endpoint(endpoint).copied()
    }

    pub async fn cached_entries(&self) -> usize {
        self.cache.lock().await.len()
    }
}

fn build_http_client(headers: &HeaderMap, timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .default_headers(headers.clone())
        .timeout(timeout)
        .build()
        .map_err(|err| Error::Other(anyhow::Error::new(err).context("building HTTP client")))
}

fn classify(status: StatusCode, limits: RateLimitSnapshot, body: String) -> Outcome {
    match status {
        StatusCode::UNAUTHORIZED => Outcome::AuthRejected,
        StatusCode::FORBIDDEN => {
            if limits.exhausted() {
                Outcome::Setback(Setback::RateLimited {
                    reset_at: limits.reset_at,
                })
            } else if body.to_ascii_lowercase().contains("too large") {
                Outcome::ListTooLarge
            } else {
                Outcome::Terminal { status: 403 }
            }
        }
        StatusCode::INTERNAL_SERVER_ERROR | StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => {
            Outcome::Setback(Setback::Transient {
                empty_body: body.trim().is_empty(),
            })
        }
        StatusCode::ACCEPTED => Outcome::Success {
            accepted: true,
            body,
        },
        status if status.is_success() => {
            if body.trim().is_empty() {
                return Outcome::Setback(Setback::Transient { empty_body: true });
            }
            if serde_json::from_str::<serde_json::Value>(&body).is_err() {
                // HTML maintenance pages and the like.
                return Outcome::Setback(Setback::Transient { empty_body: false });
            }
            Outcome::Success {
                accepted: false,
                body,
            }
        }
        status => Outcome::Terminal {
            status: status.as_u16(),
        },
    }
}

fn normalize_list<T: DeserializeOwned>(body: &str) -> Result<Vec<T>> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|err| Error::Payload(err.to_string()))?;
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(|err| Error::Payload(err.to_string())))
            .collect(),
        // An object where an array belongs means the data is not ready.
        serde_json::Value::Object(_) => Ok(Vec::new()),
        other => Err(Error::Payload(format!("expected a collection, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(remaining: Option<u32>, reset_at: Option<i64>) -> RateLimitSnapshot {
        RateLimitSnapshot { remaining, reset_at }
    }

    #[test]
    fn unauthorized_is_fatal() {
        let outcome = classify(StatusCode::UNAUTHORIZED, limits(None, None), String::new());
        assert_eq!(outcome, Outcome::AuthRejected);
    }

    #[test]
    fn exhausted_forbidden_is_rate_limited() {
        let outcome = classify(
            StatusCode::FORBIDDEN,
            limits(Some(0), Some(1_700_000_060)),
            "rate limit exceeded".to_string(),
        );
        assert_eq!(
            outcome,
            Outcome::Setback(Setback::RateLimited {
                reset_at: Some(1_700_000_060)
            })
        );
    }

    #[test]
    fn too_large_forbidden_is_feature_terminal() {
        let outcome = classify(
            StatusCode::FORBIDDEN,
            limits(Some(100), None),
            "The contributor list is too large to list via the API".to_string(),
        );
        assert_eq!(outcome, Outcome::ListTooLarge);
    }

    #[test]
    fn other_forbidden_is_terminal() {
        let outcome = classify(StatusCode::FORBIDDEN, limits(Some(100), None), "abuse".to_string());
        assert_eq!(outcome, Outcome::Terminal { status: 403 });
    }

    #[test]
    fn transient_statuses_are_retried() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            let outcome = classify(status, limits(None, None), "oops".to_string());
            assert_eq!(outcome, Outcome::Setback(Setback::Transient { empty_body: false }));
        }
    }

    #[test]
    fn empty_success_body_is_transient_with_short_delay() {
        let outcome = classify(StatusCode::OK, limits(None, None), "  ".to_string());
        assert_eq!(outcome, Outcome::Setback(Setback::Transient { empty_body: true }));
    }

    #[test]
    fn non_json_success_body_is_transient() {
        let outcome = classify(StatusCode::OK, limits(None, None), "<html>service unavailable</html>".to_string());
        assert_eq!(outcome, Outcome::Setback(Setback::Transient { empty_body: false }));
    }

    #[test]
    fn accepted_is_success_even_with_empty_body() {
        let outcome = classify(StatusCode::ACCEPTED, limits(None, None), String::new());
        assert_eq!(
            outcome,
            Outcome::Success {
                accepted: true,
                body: String::new()
            }
        );
    }

    #[test]
    fn unexpected_status_is_terminal() {
        let outcome = classify(StatusCode::NOT_FOUND, limits(None, None), "missing".to_string());
        assert_eq!(outcome, Outcome::Terminal { status: 404 });
    }

    #[test]
    fn empty_object_normalizes_to_empty_collection() {
        let items: Vec<u32> = normalize_list("{}").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn object_for_array_normalizes_to_empty_collection() {
        #[derive(serde::Deserialize)]
        struct Item {}
        let items: Vec<Item> = normalize_list(r#"{"message":"computing"}"#).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn arrays_deserialize_elementwise() {
        let items: Vec<u32> = normalize_list("[1,2,3]").unwrap();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn scalar_body_is_a_payload_error() {
        assert!(normalize_list::<u32>("42").is_err());
    }
}
