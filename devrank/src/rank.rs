use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use tokio::sync::Mutex;

use crate::api::{Client, ContributorActivity, Error, Result};
use crate::model::ContributorRankInfo;
use crate::pace;

/// Fallback pagination bounds for the basic contributors endpoint.
/// Caps `total_contributors` at 1,000 on very large repositories; a known
/// undercount, kept rather than papered over.
const FALLBACK_MAX_PAGES: u32 = 10;
const FALLBACK_PAGE_SIZE: u32 = 100;

/// Resolves the 1-based commit rank of a user among a repository's
/// contributors. Results are cached for the process lifetime.
pub struct RankResolver<CLIENT: Client> {
    client: Arc<CLIENT>,
    cache: Mutex<HashMap<(String, String), ContributorRankInfo>>,
}

impl<CLIENT: Client> RankResolver<CLIENT> {
    pub fn new(client: Arc<CLIENT>) -> Self {
        RankResolver {
            client,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, login: &str, repo_full_name: &str) -> Result<ContributorRankInfo> {
        let key = (repo_full_name.to_string(), login.to_string());
        if let Some(info) = self.cache.lock().await.get(&key) {
            debug!("Rank cache hit for {} on {}", login, repo_full_name);
            return Ok(*info);
        }

        let contributors = self.load_contributors(repo_full_name).await?;
        let info = rank_in(&contributors, login);
        self.cache.lock().await.insert(key, info);
        Ok(info)
    }

    /// Primary strategy is the commit-statistics endpoint; an empty result
    /// (still computing) or a "too large to list" rejection falls back to
    /// paginating the basic contributors endpoint.
    async fn load_contributors(&self, repo_full_name: &str) -> Result<Vec<ContributorActivity>> {
        match self.client.contributor_stats(repo_full_name).await {
            Ok(stats) if !stats.is_empty() => return Ok(stats),
            Ok(_) => debug!("Empty contributor stats for {}, falling back", repo_full_name),
            Err(Error::ContributorListTooLarge) => {
                debug!("Contributor list of {} too large, falling back", repo_full_name)
            }
            Err(err) => return Err(err),
        }
        self.paginate_contributors(repo_full_name).await
    }

    async fn paginate_contributors(&self, repo_full_name: &str) -> Result<Vec<ContributorActivity>> {
        let mut contributors = Vec::new();
        for page in 1..=FALLBACK_MAX_PAGES {
            let batch = self
                .client
                .contributors(repo_full_name, page, FALLBACK_PAGE_SIZE)
                .await?;
            let last_page = (batch.len() as u32) < FALLBACK_PAGE_SIZE;
            contributors.extend(batch);
            if last_page {
                break;
            }
            pace::between_pages().await;
        }
        Ok(contributors)
    }
}

/// Sorts contributors descending by commit count (stable, so ties keep the
/// response order) and scans for the login. Absent login resolves to the
/// not-a-contributor value with `rank == 0`.
fn rank_in(contributors: &[ContributorActivity], login: &str) -> ContributorRankInfo {
    let mut ranked: Vec<&ContributorActivity> = contributors.iter().collect();
    ranked.sort_by(|a, b| b.commits.cmp(&a.commits));
    let total = ranked.len() as u32;
    for (index, contributor) in ranked.iter().enumerate() {
        if contributor.login.eq_ignore_ascii_case(login) {
            return ContributorRankInfo {
                is_contributor: true,
                rank: index as u32 + 1,
                total_contributors: total,
                commit_count: contributor.commits,
            };
        }
    }
    ContributorRankInfo::unknown()
}
