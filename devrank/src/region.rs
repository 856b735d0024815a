use std::collections::BTreeSet;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{GitHubUser, Repository};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InclusionReason {
    /// Owned outright by a ranked user of the region.
    Owned,
    /// A ranked user of the region is the top contributor.
    TopContributor,
}

/// Cross-user aggregate of one repository, built fresh each run from the
/// accepted-user set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionProject {
    pub full_name: String,
    pub name: String,
    pub stars: u32,
    pub forks: u32,
    pub html_url: String,
    pub language: Option<String>,
    pub organization_owned: bool,
    pub inclusion: InclusionReason,
    pub region_contributors: BTreeSet<String>,
}

impl RegionProject {
    fn popularity(&self) -> u32 {
        self.stars + self.forks
    }
}

/// Folds the accepted users into a regional project ranking, sorted by
/// stars + forks descending (discovery order on ties).
///
/// Owned repositories always qualify. Contributed repositories (org or
/// external) qualify only when the user holds rank 1 — deliberately
/// stricter than the per-user score, which credits any rank.
pub fn aggregate(users: &[GitHubUser]) -> Vec<RegionProject> {
    let mut order: Vec<String> = Vec::new();
    let mut projects: HashMap<String, RegionProject> = HashMap::new();

    for user in users {
        for repo in &user.owned_repos {
            include(&mut projects, &mut order, repo, &user.login, InclusionReason::Owned);
        }
        for repo in user
            .org_contributed_repos
            .iter()
            .chain(user.externally_contributed_repos.iter())
        {
            if repo.contributor_rank == 1 {
                include(&mut projects, &mut order, repo, &user.login, InclusionReason::TopContributor);
            }
        }
    }

    let mut ranked: Vec<RegionProject> = order
        .into_iter()
        .filter_map(|full_name| projects.remove(&full_name))
        .collect();
    ranked.sort_by(|a, b| b.popularity().cmp(&a.popularity()));
    ranked
}

fn include(
    projects: &mut HashMap<String, RegionProject>,
    order: &mut Vec<String>,
    repo: &Repository,
    login: &str,
    inclusion: InclusionReason,
) {
    let project = projects.entry(repo.full_name.clone()).or_insert_with(|| {
        order.push(repo.full_name.clone());
        RegionProject {
            full_name: repo.full_name.clone(),
            name: repo.name.clone(),
            stars: repo.stars,
            forks: repo.forks,
            html_url: repo.html_url.clone(),
            language: repo.language.clone(),
            organization_owned: repo.is_organization_owned,
            inclusion,
            region_contributors: BTreeSet::new(),
        }
    });
    project.region_contributors.insert(login.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::UserKind;

    fn repo(full_name: &str, stars: u32, rank: u32, total: u32) -> Repository {
        Repository {
            name: full_name.split('/').last().unwrap().to_string(),
            full_name: full_name.to_string(),
            stars,
            forks: 0,
            html_url: String::new(),
            language: None,
            owner_login: full_name.split('/').next().unwrap().to_string(),
            is_fork: false,
            is_organization_owned: false,
            contributor_rank: rank,
            total_contributors: total,
        }
    }

    fn user(login: &str) -> GitHubUser {
        GitHubUser {
            login: login.to_string(),
            name: None,
            location: None,
            followers: 0,
            public_repos: 0,
            kind: UserKind::User,
            score: 100.0,
            accepted: true,
            owned_repos: Vec::new(),
            org_contributed_repos: Vec::new(),
            externally_contributed_repos: Vec::new(),
            all_repos: Vec::new(),
        }
    }

    #[test]
    fn owned_repos_qualify_at_any_rank() {
        let mut dev = user("dev");
        dev.owned_repos = vec![repo("dev/project", 10, 0, 0)];
        let projects = aggregate(&[dev]);
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].inclusion, InclusionReason::Owned);
    }

    #[test]
    fn contributed_repos_qualify_only_at_rank_one() {
        let mut dev = user("dev");
        dev.org_contributed_repos = vec![repo("acme/top", 10, 1, 4), repo("acme/second", 99, 2, 4)];
        dev.externally_contributed_repos = vec![repo("friend/lib", 5, 3, 3)];
        let projects = aggregate(&[dev]);
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].full_name, "acme/top");
        assert_eq!(projects[0].inclusion, InclusionReason::TopContributor);
    }

    #[test]
    fn contributors_merge_across_users_and_sort_is_by_popularity() {
        let mut a = user("a");
        a.owned_repos = vec![repo("a/small", 3, 0, 0)];
        a.org_contributed_repos = vec![repo("acme/shared", 50, 1, 9)];
        let mut b = user("b");
        b.org_contributed_repos = vec![repo("acme/shared", 50, 1, 9)];
        let projects = aggregate(&[a, b]);
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].full_name, "acme/shared");
        let contributors: Vec<&str> = projects[0]
            .region_contributors
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(contributors, vec!["a", "b"]);
    }
}
