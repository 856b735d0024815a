use std::collections::HashMap;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinHandle;

use crate::api::{Client, Result, Sort};
use crate::collector::RepoCollector;
use crate::model::GitHubUser;
use crate::pace;
use crate::rank::RankResolver;
use crate::score;

const SEARCH_PAGE_SIZE: u32 = 100;
const MAX_SEARCH_PAGES: u32 = 10;
const CHANNEL_CAPACITY: usize = 10;

/// Drives the whole pipeline for one region: user discovery, per-user
/// collection and scoring, strictly one upstream call at a time. Completed
/// users (accepted or not) are streamed through the returned channel in
/// discovery order.
pub struct RegionRanker<CLIENT: 'static + Client> {
    client: Arc<CLIENT>,
    collector: RepoCollector<CLIENT>,
}

impl<CLIENT: 'static + Client> RegionRanker<CLIENT> {
    pub fn new(client: CLIENT) -> Self {
        let client = Arc::new(client);
        let resolver = Arc::new(RankResolver::new(client.clone()));
        let collector = RepoCollector::new(client.clone(), resolver);
        RegionRanker { client, collector }
    }

    /// `resume` holds users already completed by a previous run; they are
    /// re-emitted without any upstream calls. The returned handle resolves
    /// once the pipeline finishes; a fatal error (auth rejection,
    /// cancellation, discovery failure) surfaces there after the channel
    /// closes, so callers must check it even when users were received.
    pub fn rank(
        self,
        region: String,
        sort: Sort,
        user_count: u32,
        resume: HashMap<String, GitHubUser>,
    ) -> (Receiver<GitHubUser>, JoinHandle<Result<()>>) {
        let (sender, receiver) = tokio::sync::mpsc::channel::<GitHubUser>(CHANNEL_CAPACITY);
        let worker =
            tokio::spawn(async move { self.run(region, sort, user_count, resume, sender).await });
        (receiver, worker)
    }

    async fn run(
        self,
        region: String,
        sort: Sort,
        user_count: u32,
        resume: HashMap<String, GitHubUser>,
        sender: Sender<GitHubUser>,
    ) -> Result<()> {
        let logins = self.discover(&region, sort, user_count).await?;
        info!("Discovered {} users in {}", logins.len(), region);

        for login in logins {
            match self.process_user(&login, &resume).await {
                Ok(user) => {
                    if sender.send(user).await.is_err() {
                        return Ok(());
                    }
                }
                Err(err) if err.is_fatal() => {
                    error!("Aborting run: {}", err);
                    return Err(err);
                }
                Err(err) => warn!("Skipping user {}: {}", login, err),
            }
            pace::between_users().await;
        }
        Ok(())
    }

    async fn discover(&self, region: &str, sort: Sort, user_count: u32) -> Result<Vec<String>> {
        let query = format!("location:{}", region);
        let mut logins = Vec::new();
        let mut pager = Pager::new(user_count, SEARCH_PAGE_SIZE);
        while let Some(page) = pager.next_page() {
            if page.number > MAX_SEARCH_PAGES {
                break;
            }
            let found = self
                .client
                .search_users(&query, sort, page.number, page.size)
                .await?;
            let last_page = (found.len() as u32) < page.size;
            logins.extend(found.into_iter().map(|user| user.login));
            if last_page {
                break;
            }
            pace::between_pages().await;
        }
        logins.truncate(user_count as usize);
        Ok(logins)
    }

    async fn process_user(
        &self,
        login: &str,
        resume: &HashMap<String, GitHubUser>,
    ) -> Result<GitHubUser> {
        if let Some(user) = resume.get(login) {
            info!("Resuming {} from snapshot", login);
            return Ok(user.clone());
        }

        let detail = self.client.user(login).await?;
        let mut user = GitHubUser::from_detail(detail);
        if user.is_organization() {
            info!("{} is an organization, excluded from scoring", login);
            return Ok(user);
        }

        let collected = self.collector.collect(login).await?;
        user.owned_repos = collected.owned;
        user.org_contributed_repos = collected.org_contributed;
        user.externally_contributed_repos = collected.externally_contributed;
        user.all_repos = collected.all;

        let outcome = score::score_user(&user);
        user.score = outcome.score;
        user.accepted = outcome.accepted;
        info!(
            "Scored {}: {:.1} ({})",
            login,
            user.score,
            if user.accepted { "accepted" } else { "rejected" }
        );
        Ok(user)
    }
}

#[derive(Debug, PartialEq, Eq)]
struct PageRequest {
    number: u32,
    size: u32,
}

/// Splits a wanted item count into successive page requests, first page 1.
struct Pager {
    next: u32,
    page_size: u32,
    remaining: u32,
}

impl Pager {
    fn new(wanted: u32, page_size: u32) -> Self {
        Pager {
            next: 1,
            page_size,
            remaining: wanted,
        }
    }

    fn next_page(&mut self) -> Option<PageRequest> {
        if self.remaining == 0 {
            return None;
        }
        let size = self.remaining.min(self.page_size);
        let number = self.next;
        self.next += 1;
        self.remaining -= size;
        Some(PageRequest { number, size })
    }
}
