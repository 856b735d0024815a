use serde::{Deserialize, Serialize};

use crate::api::{RepoData, UserDetail, UserKind};

/// Rank of a user among a repository's contributors. Immutable once
/// computed; `rank == 0` means no rank data is available and scoring
/// falls back to un-weighted star/fork counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorRankInfo {
    pub is_contributor: bool,
    pub rank: u32,
    pub total_contributors: u32,
    pub commit_count: u32,
}

impl ContributorRankInfo {
    pub fn unknown() -> Self {
        ContributorRankInfo {
            is_contributor: false,
            rank: 0,
            total_contributors: 0,
            commit_count: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub stars: u32,
    pub forks: u32,
    pub html_url: String,
    pub language: Option<String>,
    pub owner_login: String,
    pub is_fork: bool,
    pub is_organization_owned: bool,
    pub contributor_rank: u32,
    pub total_contributors: u32,
}

impl Repository {
    pub fn from_api(repo: &RepoData) -> Self {
        Repository {
            name: repo.name.clone(),
            full_name: repo.full_name.clone(),
            stars: repo.stars,
            forks: repo.forks,
            html_url: repo.html_url.clone(),
            language: repo.language.clone(),
            owner_login: repo.owner_login.clone(),
            is_fork: repo.fork,
            is_organization_owned: repo.owner_kind == UserKind::Organization,
            contributor_rank: 0,
            total_contributors: 0,
        }
    }

    pub fn with_rank(repo: &RepoData, rank: &ContributorRankInfo) -> Self {
        let mut repository = Self::from_api(repo);
        repository.contributor_rank = rank.rank;
        repository.total_contributors = rank.total_contributors;
        repository
    }

    /// Popularity key used for every top-N reduction and display sort.
    pub fn popularity(&self) -> u32 {
        self.stars + self.forks
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub followers: u32,
    pub public_repos: u32,
    pub kind: UserKind,
    pub score: f64,
    pub accepted: bool,
    pub owned_repos: Vec<Repository>,
    pub org_contributed_repos: Vec<Repository>,
    pub externally_contributed_repos: Vec<Repository>,
    pub all_repos: Vec<Repository>,
}

impl GitHubUser {
    pub fn from_detail(detail: UserDetail) -> Self {
        GitHubUser {
            login: detail.login,
            name: detail.name,
            location: detail.location,
            followers: detail.followers,
            public_repos: detail.public_repos,
            kind: detail.kind,
            score: 0.0,
            accepted: false,
            owned_repos: Vec::new(),
            org_contributed_repos: Vec::new(),
            externally_contributed_repos: Vec::new(),
            all_repos: Vec::new(),
        }
    }

    pub fn is_organization(&self) -> bool {
        self.kind == UserKind::Organization
    }
}
