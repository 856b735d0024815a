//! Per-endpoint call accounting. Every terminal call (success or failure)
//! lands here under a normalized endpoint template, so diagnostics survive
//! the concrete owner/repo/login parameters.

use std::collections::HashMap;
use std::time::Duration;

use log::info;
use url::Url;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EndpointStats {
    pub calls: u64,
    pub failures: u64,
    pub retries: u64,
    pub cache_hits: u64,
    pub total_latency: Duration,
}

#[derive(Default)]
pub struct CallStats {
    endpoints: HashMap<String, EndpointStats>,
}

impl CallStats {
    pub fn record_call(&mut self, endpoint: &str, latency: Duration, retries: u32, ok: bool) {
        let entry = self.endpoints.entry(endpoint.to_string()).or_default();
        entry.calls += 1;
        entry.retries += retries as u64;
        entry.total_latency += latency;
        if !ok {
            entry.failures += 1;
        }
    }

    pub fn record_cache_hit(&mut self, endpoint: &str) {
        self.endpoints.entry(endpoint.to_string()).or_default().cache_hits += 1;
    }

    pub fn endpoint(&self, endpoint: &str) -> Option<&EndpointStats> {
        self.endpoints.get(endpoint)
    }

    pub fn log_summary(&self) {
        let mut endpoints: Vec<(&String, &EndpointStats)> = self.endpoints.iter().collect();
        endpoints.sort_by_key(|(name, _)| name.to_string());
        for (name, stats) in endpoints {
            info!(
                "{}: {} calls, {} failures, {} retries, {} cache hits, {:?} total latency",
                name, stats.calls, stats.failures, stats.retries, stats.cache_hits, stats.total_latency
            );
        }
    }
}

/// Reduces a concrete URL to its endpoint template, e.g.
/// `repos/{owner}/{repo}/stats/contributors`. Unknown shapes keep their
/// literal path.
pub fn endpoint_template(url: &Url) -> String {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    match segments.as_slice() {
        ["search", "users"] => "search/users".to_string(),
        ["search", "issues"] => "search/issues".to_string(),
        ["users", _] => "users/{login}".to_string(),
        ["users", _, "repos"] => "users/{login}/repos".to_string(),
        ["users", _, "orgs"] => "users/{login}/orgs".to_string(),
        ["orgs", _, "repos"] => "orgs/{org}/repos".to_string(),
        ["repos", _, _] => "repos/{owner}/{repo}".to_string(),
        ["repos", _, _, "contributors"] => "repos/{owner}/{repo}/contributors".to_string(),
        ["repos", _, _, "stats", "contributors"] => {
            "repos/{owner}/{repo}/stats/contributors".to_string()
        }
        _ => segments.join("/"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(s: &str) -> String {
        endpoint_template(&Url::parse(s).unwrap())
    }

    #[test]
    fn known_endpoints_are_templated() {
        assert_eq!(
            template("https://api.github.com/repos/rust-lang/rust/stats/contributors"),
            "repos/{owner}/{repo}/stats/contributors"
        );
        assert_eq!(template("https://api.github.com/users/dev?x=1"), "users/{login}");
        assert_eq!(
            template("https://api.github.com/users/dev/repos?page=2"),
            "users/{login}/repos"
        );
        assert_eq!(template("https://api.github.com/orgs/acme/repos"), "orgs/{org}/repos");
        assert_eq!(template("https://api.github.com/search/users?q=x"), "search/users");
    }

    #[test]
    fn unknown_shapes_keep_their_path() {
        assert_eq!(template("https://api.github.com/rate_limit"), "rate_limit");
    }

    #[test]
    fn retries_and_failures_accumulate() {
        let mut stats = CallStats::default();
        stats.record_call("users/{login}", Duration::from_millis(10), 3, true);
        stats.record_call("users/{login}", Duration::from_millis(5), 0, false);
        stats.record_cache_hit("users/{login}");
        let entry = stats.endpoint("users/{login}").unwrap();
        assert_eq!(entry.calls, 2);
        assert_eq!(entry.retries, 3);
        assert_eq!(entry.failures, 1);
        assert_eq!(entry.cache_hits, 1);
        assert_eq!(entry.total_latency, Duration::from_millis(15));
    }
}
