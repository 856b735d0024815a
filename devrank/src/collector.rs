use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, warn};

use crate::api::{Client, Result, UserKind};
use crate::model::{ContributorRankInfo, Repository};
use crate::pace;
use crate::rank::RankResolver;

const REPO_PAGE_SIZE: u32 = 100;
const MAX_REPO_PAGES: u32 = 10;
const ORG_REPO_CAP: usize = 20;
const PR_PAGE_SIZE: u32 = 100;
const MAX_PR_PAGES: u32 = 10;
/// External contribution lookups stop after this many repositories have
/// been examined, to bound API usage per user.
const EXTERNAL_EXAMINE_CAP: usize = 30;
const MIN_STARS: u32 = 2;
const TOP_REPOS: usize = 5;

/// The three categorized repository sets collected for one user, plus the
/// unreduced union kept for completeness.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollectedRepos {
    pub owned: Vec<Repository>,
    pub org_contributed: Vec<Repository>,
    pub externally_contributed: Vec<Repository>,
    pub all: Vec<Repository>,
}

pub struct RepoCollector<CLIENT: Client> {
    client: Arc<CLIENT>,
    resolver: Arc<RankResolver<CLIENT>>,
}

impl<CLIENT: Client> RepoCollector<CLIENT> {
    pub fn new(client: Arc<CLIENT>, resolver: Arc<RankResolver<CLIENT>>) -> Self {
        RepoCollector { client, resolver }
    }

    pub async fn collect(&self, login: &str) -> Result<CollectedRepos> {
        let owned = self.collect_owned(login).await?;
        let org_contributed = self.collect_org_contributed(login).await?;
        let externally_contributed = self.collect_external(login).await?;

        let mut all = Vec::new();
        all.extend(owned.iter().cloned());
        all.extend(org_contributed.iter().cloned());
        all.extend(externally_contributed.iter().cloned());

        Ok(CollectedRepos {
            owned: top_by_popularity(owned),
            org_contributed: top_by_popularity(org_contributed),
            externally_contributed: top_by_popularity(externally_contributed),
            all,
        })
    }

    /// Non-fork repositories with enough stars are kept verbatim. Forks are
    /// attributed to their parent project instead: if the user holds any
    /// contributor rank on the parent and the parent has enough stars, the
    /// parent is recorded, marked non-fork.
    async fn collect_owned(&self, login: &str) -> Result<Vec<Repository>> {
        let mut owned = Vec::new();
        for page in 1..=MAX_REPO_PAGES {
            let repos = self.client.user_repos(login, page, REPO_PAGE_SIZE).await?;
            let last_page = (repos.len() as u32) < REPO_PAGE_SIZE;
            for repo in &repos {
                if !repo.fork {
                    if repo.stars >= MIN_STARS {
                        owned.push(Repository::from_api(repo));
                    }
                    continue;
                }
                if let Some(parent) = self.fork_parent_repo(login, &repo.full_name).await? {
                    owned.push(parent);
                }
            }
            if last_page {
                break;
            }
            pace::between_pages().await;
        }
        debug!("{}: {} owned repositories qualified", login, owned.len());
        Ok(owned)
    }

    async fn fork_parent_repo(&self, login: &str, fork_full_name: &str) -> Result<Option<Repository>> {
        let detail = match self.client.repo(fork_full_name).await {
            Ok(detail) => detail,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!("Skipping fork {}: {}", fork_full_name, err);
                return Ok(None);
            }
        };
        let parent = match detail.parent {
            Some(parent) => parent,
            None => return Ok(None),
        };
        if parent.stars < MIN_STARS {
            return Ok(None);
        }
        let rank = match self.rank_or_skip(login, &parent.full_name).await? {
            Some(rank) => rank,
            None => return Ok(None),
        };
        if !rank.is_contributor {
            return Ok(None);
        }
        // Evaluated as the canonical project from here on.
        let mut repository = Repository::with_rank(&parent, &rank);
        repository.is_fork = false;
        Ok(Some(repository))
    }

    async fn collect_org_contributed(&self, login: &str) -> Result<Vec<Repository>> {
        let mut contributed = Vec::new();
        let orgs = self.client.user_orgs(login).await?;
        for org in &orgs {
            let repos = self.client.org_repos(&org.login, 1, ORG_REPO_CAP as u32).await?;
            for repo in repos.iter().take(ORG_REPO_CAP) {
                if repo.stars < MIN_STARS {
                    continue;
                }
                let rank = match self.rank_or_skip(login, &repo.full_name).await? {
                    Some(rank) if rank.is_contributor => rank,
                    _ => continue,
                };
                contributed.push(Repository::with_rank(repo, &rank));
            }
            pace::between_pages().await;
        }
        debug!("{}: {} org repositories qualified", login, contributed.len());
        Ok(contributed)
    }

    /// Repositories reached through pull requests authored by the user.
    /// Self-owned and organization-owned targets are skipped here since the
    /// owned and org paths already cover them.
    async fn collect_external(&self, login: &str) -> Result<Vec<Repository>> {
        let mut contributed = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut examined = 0usize;
        'pages: for page in 1..=MAX_PR_PAGES {
            let refs = self.client.search_prs(login, page, PR_PAGE_SIZE).await?;
            let last_page = (refs.len() as u32) < PR_PAGE_SIZE;
            for pr in &refs {
                if !seen.insert(pr.repo_full_name.clone()) {
                    continue;
                }
                if pr.owner_login.eq_ignore_ascii_case(login) {
                    continue;
                }
                let detail = match self.client.repo(&pr.repo_full_name).await {
                    Ok(detail) => detail,
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => {
                        warn!("Skipping contributed repo {}: {}", pr.repo_full_name, err);
                        continue;
                    }
                };
                if detail.owner_kind == UserKind::Organization {
                    continue;
                }
                examined += 1;
                if let Some(rank) = self.rank_or_skip(login, &detail.full_name).await? {
                    if rank.is_contributor && detail.stars >= MIN_STARS {
                        contributed.push(Repository::with_rank(&detail, &rank));
                    }
                }
                if examined >= EXTERNAL_EXAMINE_CAP {
                    break 'pages;
                }
            }
            if last_page {
                break;
            }
            pace::between_pages().await;
        }
        debug!("{}: {} external repositories qualified", login, contributed.len());
        Ok(contributed)
    }

    /// One repository's rank-resolution failure never aborts the user.
    async fn rank_or_skip(&self, login: &str, repo_full_name: &str) -> Result<Option<ContributorRankInfo>> {
        match self.resolver.resolve(login, repo_full_name).await {
            Ok(rank) => Ok(Some(rank)),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!("Rank resolution failed for {} on {}: {}", login, repo_full_name, err);
                Ok(None)
            }
        }
    }
}

/// Top 5 by stars + forks; stable, so equal popularity keeps discovery order.
fn top_by_popularity(mut repos: Vec<Repository>) -> Vec<Repository> {
    repos.sort_by(|a, b| b.popularity().cmp(&a.popularity()));
    repos.truncate(TOP_REPOS);
    repos
}
