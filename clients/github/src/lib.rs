use std::sync::Arc;

use async_trait::async_trait;
use devrank::api::{
    Client, ContributorActivity, Error, OrgSummary, PullRequestRef, RepoData, Result, Sort,
    UserDetail, UserSummary,
};
use url::Url;

pub mod builder;
pub mod cache;
pub mod gateway;
pub mod limiter;
mod payload;
pub mod retry;
pub mod stats;

pub use builder::GithubClientBuilder;
use gateway::Gateway;

/// GitHub implementation of the ranking engine's client trait. Cheap to
/// clone; all state lives behind the shared gateway.
#[derive(Clone)]
pub struct GithubClient {
    gateway: Arc<Gateway>,
    github_url: String,
}

impl GithubClient {
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Persists the response cache to the configured cache directory.
    pub async fn save_cache(&self) -> Result<()> {
        self.gateway.save_cache().await
    }

    pub async fn log_stats(&self) {
        self.gateway.log_stats().await
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<String> {
        let mut url = Url::parse(&format!("{}/{}", self.github_url, path))
            .map_err(|err| Error::Payload(format!("invalid endpoint {}: {}", path, err)))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url.into())
    }
}

#[async_trait]
impl Client for GithubClient {
    async fn search_users(
        &self,
        query: &str,
        sort: Sort,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<UserSummary>> {
        let url = self.endpoint(
            "search/users",
            &[
                ("q", query),
                ("sort", &sort.to_string()),
                ("order", "desc"),
                ("page", &page.to_string()),
                ("per_page", &per_page.to_string()),
            ],
        )?;
        let found = self.gateway.fetch::<payload::SearchUsers>(&url).await?;
        Ok(found.items.into_iter().map(UserSummary::from).collect())
    }

    async fn user(&self, login: &str) -> Result<UserDetail> {
        let url = self.endpoint(&format!("users/{}", login), &[])?;
        let user = self.gateway.fetch::<payload::User>(&url).await?;
        Ok(UserDetail::from(user))
    }

    async fn user_repos(&self, login: &str, page: u32, per_page: u32) -> Result<Vec<RepoData>> {
        let url = self.endpoint(
            &format!("users/{}/repos", login),
            &[("page", &page.to_string()), ("per_page", &per_page.to_string())],
        )?;
        let repos = self.gateway.fetch_list::<payload::Repo>(&url).await?;
        Ok(repos.into_iter().map(RepoData::from).collect())
    }

    async fn repo(&self, full_name: &str) -> Result<RepoData> {
        let url = self.endpoint(&format!("repos/{}", full_name), &[])?;
        let repo = self.gateway.fetch::<payload::Repo>(&url).await?;
        Ok(RepoData::from(repo))
    }

    async fn user_orgs(&self, login: &str) -> Result<Vec<OrgSummary>> {
        let url = self.endpoint(&format!("users/{}/orgs", login), &[("per_page", "100")])?;
        let orgs = self.gateway.fetch_list::<payload::Org>(&url).await?;
        Ok(orgs.into_iter().map(OrgSummary::from).collect())
    }

    async fn org_repos(&self, org: &str, page: u32, per_page: u32) -> Result<Vec<RepoData>> {
        let url = self.endpoint(
            &format!("orgs/{}/repos", org),
            &[("page", &page.to_string()), ("per_page", &per_page.to_string())],
        )?;
        let repos = self.gateway.fetch_list::<payload::Repo>(&url).await?;
        Ok(repos.into_iter().map(RepoData::from).collect())
    }

    async fn contributor_stats(&self, repo_full_name: &str) -> Result<Vec<ContributorActivity>> {
        let url = self.endpoint(&format!("repos/{}/stats/contributors", repo_full_name), &[])?;
        let stats = self
            .gateway
            .fetch_list::<payload::ContributorStats>(&url)
            .await?;
        Ok(stats
            .into_iter()
            .filter_map(payload::ContributorStats::into_activity)
            .collect())
    }

    async fn contributors(
        &self,
        repo_full_name: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<ContributorActivity>> {
        let url = self.endpoint(
            &format!("repos/{}/contributors", repo_full_name),
            &[("page", &page.to_string()), ("per_page", &per_page.to_string())],
        )?;
        let contributors = self.gateway.fetch_list::<payload::Contributor>(&url).await?;
        Ok(contributors.into_iter().map(ContributorActivity::from).collect())
    }

    async fn search_prs(
        &self,
        author: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<PullRequestRef>> {
        let query = format!("type:pr author:{}", author);
        let url = self.endpoint(
            "search/issues",
            &[
                ("q", &query),
                ("page", &page.to_string()),
                ("per_page", &per_page.to_string()),
            ],
        )?;
        let found = self.gateway.fetch::<payload::SearchIssues>(&url).await?;
        Ok(found
            .items
            .into_iter()
            .filter_map(payload::Issue::into_pull_request_ref)
            .collect())
    }
}
