use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// 401 from the API. Credentials cannot self-heal, the whole run aborts.
    #[error("authentication rejected by the API")]
    AuthRejected,
    /// Operator interrupt observed at a suspension point.
    #[error("run cancelled")]
    Cancelled,
    /// 403 telling us the contributor list is too large to enumerate.
    /// Callers fall back to the paginated contributors endpoint.
    #[error("contributor list too large to enumerate")]
    ContributorListTooLarge,
    /// Unexpected 4xx/5xx that no retry policy applies to.
    #[error("unexpected status {status} from {endpoint}")]
    Status { status: u16, endpoint: String },
    #[error("malformed response payload: {0}")]
    Payload(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Fatal errors abort the whole run; anything else is scoped to the
    /// user or repository being processed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::AuthRejected | Error::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// User search sort order understood by the upstream search endpoint.
#[derive(Clone, Copy, Debug, Display, EnumString, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum Sort {
    Followers,
    Repositories,
    Joined,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserKind {
    User,
    Organization,
}

impl UserKind {
    pub fn from_api(kind: Option<&str>) -> Self {
        match kind {
            Some("Organization") => UserKind::Organization,
            _ => UserKind::User,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserSummary {
    pub login: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UserDetail {
    pub login: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub followers: u32,
    pub public_repos: u32,
    pub kind: UserKind,
}

/// Repository as returned by the API, defaults already resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct RepoData {
    pub name: String,
    pub full_name: String,
    pub stars: u32,
    pub forks: u32,
    pub html_url: String,
    pub language: Option<String>,
    pub owner_login: String,
    pub owner_kind: UserKind,
    pub fork: bool,
    /// Present only on single-repository detail responses for forks.
    pub parent: Option<Box<RepoData>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrgSummary {
    pub login: String,
}

/// One contributor's activity on a repository, from either the
/// commit-statistics endpoint or the basic contributors listing.
#[derive(Clone, Debug, PartialEq, Eq, derive_more::Constructor)]
pub struct ContributorActivity {
    pub login: String,
    pub commits: u32,
}

/// Repository referenced by a pull request authored by the searched user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullRequestRef {
    pub repo_full_name: String,
    pub owner_login: String,
}

/// Everything the ranking engine needs from the upstream API. One
/// implementation per upstream; the engine stays generic over it.
#[async_trait]
pub trait Client: Send + Sync {
    async fn search_users(&self, query: &str, sort: Sort, page: u32, per_page: u32)
        -> Result<Vec<UserSummary>>;

    async fn user(&self, login: &str) -> Result<UserDetail>;

    async fn user_repos(&self, login: &str, page: u32, per_page: u32) -> Result<Vec<RepoData>>;

    /// Single-repository detail; the only call that resolves fork parents.
    async fn repo(&self, full_name: &str) -> Result<RepoData>;

    async fn user_orgs(&self, login: &str) -> Result<Vec<OrgSummary>>;

    async fn org_repos(&self, org: &str, page: u32, per_page: u32) -> Result<Vec<RepoData>>;

    /// Commit-statistics endpoint. May legitimately resolve to an empty
    /// list while the upstream is still computing the statistics.
    async fn contributor_stats(&self, repo_full_name: &str) -> Result<Vec<ContributorActivity>>;

    async fn contributors(
        &self,
        repo_full_name: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ContributorActivity>>;

    async fn search_prs(&self, author: &str, page: u32, per_page: u32)
        -> Result<Vec<PullRequestRef>>;
}
