//! Wire payloads. Every optional or missing upstream field is resolved to
//! its default here, at the deserialization boundary, so business logic
//! never sees partially populated data.

use serde::Deserialize;

use devrank::api::{
    ContributorActivity, OrgSummary, PullRequestRef, RepoData, UserDetail, UserKind, UserSummary,
};

#[derive(Deserialize, Debug)]
pub struct SearchUsers {
    #[serde(default)]
    pub items: Vec<SearchUser>,
}

#[derive(Deserialize, Debug)]
pub struct SearchUser {
    pub login: String,
}

impl From<SearchUser> for UserSummary {
    fn from(user: SearchUser) -> Self {
        UserSummary { login: user.login }
    }
}

#[derive(Deserialize, Debug)]
pub struct User {
    pub login: String,
    pub name: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub followers: u32,
    #[serde(default)]
    pub public_repos: u32,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl From<User> for UserDetail {
    fn from(user: User) -> Self {
        UserDetail {
            login: user.login,
            name: user.name,
            location: user.location,
            followers: user.followers,
            public_repos: user.public_repos,
            kind: UserKind::from_api(user.kind.as_deref()),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct Repo {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    #[serde(default)]
    pub html_url: String,
    pub language: Option<String>,
    pub owner: Option<RepoOwner>,
    #[serde(default)]
    pub fork: bool,
    pub parent: Option<Box<Repo>>,
}

#[derive(Deserialize, Debug)]
pub struct RepoOwner {
    pub login: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl From<Repo> for RepoData {
    fn from(repo: Repo) -> Self {
        let (owner_login, owner_kind) = match repo.owner {
            Some(owner) => (owner.login, UserKind::from_api(owner.kind.as_deref())),
            None => (String::new(), UserKind::User),
        };
        RepoData {
            name: repo.name,
            full_name: repo.full_name,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            html_url: repo.html_url,
            language: repo.language,
            owner_login,
            owner_kind,
            fork: repo.fork,
            parent: repo.parent.map(|parent| Box::new(RepoData::from(*parent))),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct Org {
    pub login: String,
}

impl From<Org> for OrgSummary {
    fn from(org: Org) -> Self {
        OrgSummary { login: org.login }
    }
}

/// One entry of the commit-statistics endpoint. `author` is null for
/// commits the upstream could not attribute; those entries carry no rank
/// information and are dropped.
#[derive(Deserialize, Debug)]
pub struct ContributorStats {
    pub author: Option<StatsAuthor>,
    #[serde(default)]
    pub total: u32,
}

#[derive(Deserialize, Debug)]
pub struct StatsAuthor {
    pub login: String,
}

impl ContributorStats {
    pub fn into_activity(self) -> Option<ContributorActivity> {
        let author = self.author?;
        Some(ContributorActivity::new(author.login, self.total))
    }
}

#[derive(Deserialize, Debug)]
pub struct Contributor {
    pub login: String,
    #[serde(default)]
    pub contributions: u32,
}

impl From<Contributor> for ContributorActivity {
    fn from(contributor: Contributor) -> Self {
        ContributorActivity::new(contributor.login, contributor.contributions)
    }
}

#[derive(Deserialize, Debug)]
pub struct SearchIssues {
    #[serde(default)]
    pub items: Vec<Issue>,
}

#[derive(Deserialize, Debug)]
pub struct Issue {
    /// API URL of the repository the issue belongs to, e.g.
    /// `https://api.github.com/repos/owner/name`.
    pub repository_url: String,
}

impl Issue {
    pub fn into_pull_request_ref(self) -> Option<PullRequestRef> {
        let mut segments = self.repository_url.rsplit('/');
        let name = segments.next()?;
        let owner = segments.next()?;
        if name.is_empty() || owner.is_empty() {
            return None;
        }
        Some(PullRequestRef {
            repo_full_name: format!("{}/{}", owner, name),
            owner_login: owner.to_string(),
        })
    }
}
