use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::Context;
use devrank::api::Result;
use devrank::engine::RegionRanker;
use devrank::model::GitHubUser;
use devrank::region::{self, RegionProject};
use github_client::GithubClientBuilder;
use log::info;
use tokio::sync::watch;

pub mod args;
mod snapshot;

pub use args::Args;

const SNAPSHOT_FILE: &str = "users.json";

#[derive(Debug)]
pub struct RegionReport {
    /// Accepted users in descending score order; equal scores keep
    /// discovery order.
    pub users: Vec<GitHubUser>,
    /// Regional project ranking built from the accepted users.
    pub projects: Vec<RegionProject>,
}

pub async fn rank_region(args: Args) -> Result<RegionReport> {
    let _ = env_logger::try_init();

    let (shutdown_sender, shutdown_receiver) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_sender.send(true);
        }
    });

    let mut builder = GithubClientBuilder::default()
        .with_github_url(&args.api_url)
        .with_cache_dir(&args.cache_dir)
        .with_shutdown(shutdown_receiver);
    if let Some(token) = args.api_token {
        builder = builder.try_with_token(token)?;
    }
    let client = builder.build()?;

    let snapshot_path = args.cache_dir.join(SNAPSHOT_FILE);
    let resume = snapshot::load(&snapshot_path)?;
    if !resume.is_empty() {
        info!("Resuming with {} users from {}", resume.len(), snapshot_path.display());
    }

    let ranker = RegionRanker::new(client.clone());
    let (mut receiver, worker) =
        ranker.rank(args.region, args.sort, args.user_count, resume.clone());

    let mut completed: Vec<GitHubUser> = Vec::new();
    let mut persisted: HashMap<String, GitHubUser> = resume;
    while let Some(user) = receiver.recv().await {
        persisted.insert(user.login.clone(), user.clone());
        snapshot::save(&snapshot_path, &persisted)?;
        completed.push(user);
    }

    client.save_cache().await?;
    client.log_stats().await;

    // The snapshot already holds every completed user, so a rerun resumes
    // where this one aborted.
    worker.await.context("ranking pipeline panicked")??;

    let mut users: Vec<GitHubUser> = completed
        .into_iter()
        .filter(|user| user.accepted && !user.is_organization())
        .collect();
    users.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    let projects = region::aggregate(&users);

    Ok(RegionReport { users, projects })
}
