use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use devrank::api::Result;
use reqwest::header;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use secrecy::ExposeSecret;
use tokio::sync::watch;

use crate::cache::ResponseCache;
use crate::gateway::Gateway;
use crate::retry::Backoff;
use crate::GithubClient;

/// Upstream-recommended client timeout; a request outliving it counts as a
/// transient network failure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5 * 60);

pub struct GithubClientBuilder {
    github_url: String,
    headers: HeaderMap,
    cache_dir: Option<PathBuf>,
    backoff: Backoff,
    shutdown: Option<watch::Receiver<bool>>,
}

impl Default for GithubClientBuilder {
    fn default() -> Self {
        let builder = Self {
            github_url: "https://api.github.com".to_string(),
            headers: HeaderMap::default(),
            cache_dir: None,
            backoff: Backoff::default(),
            shutdown: None,
        };
        builder
            .try_with_header(header::USER_AGENT, "devrank")
            .and_then(|builder| builder.try_with_header(header::ACCEPT, "application/vnd.github.v3+json"))
            .unwrap_or_else(|_| unreachable!("static default headers are valid"))
    }
}

impl GithubClientBuilder {
    pub fn try_with_token(self, token: secrecy::SecretString) -> Result<GithubClientBuilder> {
        Ok(self.try_with_header(header::AUTHORIZATION, format!("token {}", token.expose_secret()))?)
    }

    pub fn try_with_user_agent<STR: AsRef<str>>(self, user_agent: STR) -> Result<GithubClientBuilder> {
        Ok(self.try_with_header(header::USER_AGENT, user_agent)?)
    }

    pub fn with_github_url<STR: AsRef<str>>(mut self, url: STR) -> GithubClientBuilder {
        self.github_url = url.as_ref().trim_end_matches('/').to_string();
        self
    }

    /// Directory holding the persisted response cache. Without it the cache
    /// lives in memory only.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> GithubClientBuilder {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> GithubClientBuilder {
        self.backoff = backoff;
        self
    }

    /// Shutdown signal honored at every backoff suspension point.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> GithubClientBuilder {
        self.shutdown = Some(shutdown);
        self
    }

    fn try_with_header(mut self, key: HeaderName, val: impl AsRef<str>) -> anyhow::Result<GithubClientBuilder> {
        let val = HeaderValue::from_str(val.as_ref())?;
        self.headers.insert(key, val);
        Ok(self)
    }

    pub fn build(self) -> Result<GithubClient> {
        let cache = match &self.cache_dir {
            Some(dir) => ResponseCache::load(dir, Utc::now().timestamp())?,
            None => ResponseCache::default(),
        };
        let gateway = Gateway::new(
            self.headers,
            REQUEST_TIMEOUT,
            cache,
            self.cache_dir,
            self.backoff,
            self.shutdown,
        )?;
        Ok(GithubClient {
            gateway: Arc::new(gateway),
            github_url: self.github_url,
        })
    }
}
