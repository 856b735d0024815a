//! Durable response cache: canonical URL key -> (payload, timestamp), with
//! TTL eviction. Persisted as two flat JSON maps (payloads and timestamps)
//! so a run can be resumed days later without re-fetching unchanged data.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use devrank::api::Result;
use log::{debug, info};
use url::Url;

const PAYLOADS_FILE: &str = "responses.json";
const TIMESTAMPS_FILE: &str = "timestamps.json";

/// Entries older than this are treated as absent.
pub const CACHE_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Clone, Debug, PartialEq)]
struct CacheEntry {
    payload: String,
    stored_at: i64,
}

#[derive(Default)]
pub struct ResponseCache {
    entries: HashMap<String, CacheEntry>,
}

impl ResponseCache {
    /// Loads both map files from `dir`, zips them on key, and sweeps stale
    /// entries. Missing files yield an empty cache.
    pub fn load(dir: &Path, now: i64) -> Result<Self> {
        let payloads = read_map::<String>(&dir.join(PAYLOADS_FILE))?;
        let mut timestamps = read_map::<i64>(&dir.join(TIMESTAMPS_FILE))?;
        let entries = payloads
            .into_iter()
            .filter_map(|(key, payload)| {
                let stored_at = timestamps.remove(&key)?;
                Some((key, CacheEntry { payload, stored_at }))
            })
            .collect();
        let mut cache = ResponseCache { entries };
        cache.sweep(now);
        info!("Loaded {} cached responses", cache.entries.len());
        Ok(cache)
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).with_context(|| format!("creating cache dir {}", dir.display()))?;
        let payloads: HashMap<&String, &String> =
            self.entries.iter().map(|(k, e)| (k, &e.payload)).collect();
        let timestamps: HashMap<&String, i64> =
            self.entries.iter().map(|(k, e)| (k, e.stored_at)).collect();
        write_map(&dir.join(PAYLOADS_FILE), &payloads)?;
        write_map(&dir.join(TIMESTAMPS_FILE), &timestamps)?;
        debug!("Saved {} cached responses", self.entries.len());
        Ok(())
    }

    /// Expired entries are evicted on lookup, not just by the sweep.
    pub fn lookup(&mut self, key: &str, now: i64) -> Option<String> {
        match self.entries.get(key) {
            Some(entry) if now - entry.stored_at <= CACHE_TTL_SECS => Some(entry.payload.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Overwrites wholesale; entries are never mutated in place.
    pub fn store(&mut self, key: String, payload: String, now: i64) {
        self.entries.insert(key, CacheEntry { payload, stored_at: now });
    }

    pub fn sweep(&mut self, now: i64) {
        self.entries.retain(|_, entry| now - entry.stored_at <= CACHE_TTL_SECS);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_map<V: serde::de::DeserializeOwned>(path: &Path) -> Result<HashMap<String, V>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let map = serde_json::from_str(&contents)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(map)
}

fn write_map<V: serde::Serialize>(path: &Path, map: &V) -> Result<()> {
    let json = serde_json::to_string(map).context("serializing cache map")?;
    let temp: PathBuf = path.with_extension("tmp");
    let mut file =
        fs::File::create(&temp).with_context(|| format!("creating {}", temp.display()))?;
    file.write_all(json.as_bytes())
        .and_then(|_| file.sync_all())
        .with_context(|| format!("writing {}", temp.display()))?;
    fs::rename(&temp, path).with_context(|| format!("renaming into {}", path.display()))?;
    Ok(())
}

/// Canonical cache key: scheme://host[:port]/path plus the query pairs
/// re-joined after a lexicographic sort, so URLs differing only in
/// parameter order key identically. A non-default port is part of the key;
/// two APIs on different ports never share entries.
pub fn cache_key(url: &Url) -> String {
    let port = match url.port() {
        Some(port) => format!(":{}", port),
        None => String::new(),
    };
    let mut key = format!(
        "{}://{}{}{}",
        url.scheme(),
        url.host_str().unwrap_or_default(),
        port,
        url.path()
    );
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if !pairs.is_empty() {
        pairs.sort();
        let query: Vec<String> = pairs
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        key.push('?');
        key.push_str(&query.join("&"));
    }
    key
}

/// Volatile endpoints are never cached: search results, transitional stats
/// responses, and every page past the first of a paginated listing.
pub fn is_cacheable(url: &Url) -> bool {
    let path = url.path();
    if path.contains("/search/") || path.contains("/stats/") {
        return false;
    }
    for (key, value) in url.query_pairs() {
        if key == "page" && value != "1" {
            return false;
        }
    }
    true
}
