use crate::model::{GitHubUser, Repository};

/// Minimum combined repository score a user must exceed to be accepted.
/// Followers alone never qualify a user.
const MIN_REPO_SCORE: f64 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, derive_more::Constructor)]
pub struct ScoreOutcome {
    pub score: f64,
    pub accepted: bool,
}

/// Converts a fully collected user into a score and an accept decision.
/// Pure function; requires all three repository collections to be complete.
pub fn score_user(user: &GitHubUser) -> ScoreOutcome {
    if user.is_organization() {
        return ScoreOutcome::new(0.0, false);
    }
    let personal = personal_score(&user.owned_repos);
    let org = rank_based_score(&user.org_contributed_repos);
    let contrib = rank_based_score(&user.externally_contributed_repos);
    if personal + org + contrib <= MIN_REPO_SCORE {
        return ScoreOutcome::new(0.0, false);
    }
    let total = user.followers as f64 + personal + org + contrib;
    ScoreOutcome::new(total, true)
}

fn personal_score(repos: &[Repository]) -> f64 {
    repos.iter().map(|repo| repo.popularity() as f64).sum()
}

fn rank_based_score(repos: &[Repository]) -> f64 {
    repos
        .iter()
        .map(|repo| rank_percentage(repo) * repo.popularity() as f64)
        .sum()
}

/// Weighting factor in `[1/total, 1.0]` derived from the contributor rank.
/// Rank 1 of N weighs 1.0, rank N of N weighs 1/N. Repositories without
/// rank data weigh 1.0 (fallback scoring).
fn rank_percentage(repo: &Repository) -> f64 {
    if repo.contributor_rank == 0 || repo.total_contributors == 0 {
        return 1.0;
    }
    (repo.total_contributors - repo.contributor_rank + 1) as f64 / repo.total_contributors as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::UserKind;

    fn repo(stars: u32, forks: u32, rank: u32, total: u32) -> Repository {
        Repository {
            name: "repo".to_string(),
            full_name: "owner/repo".to_string(),
            stars,
            forks,
            html_url: String::new(),
            language: None,
            owner_login: "owner".to_string(),
            is_fork: false,
            is_organization_owned: false,
            contributor_rank: rank,
            total_contributors: total,
        }
    }

    fn user(followers: u32) -> GitHubUser {
        GitHubUser {
            login: "dev".to_string(),
            name: None,
            location: None,
            followers,
            public_repos: 0,
            kind: UserKind::User,
            score: 0.0,
            accepted: false,
            owned_repos: Vec::new(),
            org_contributed_repos: Vec::new(),
            externally_contributed_repos: Vec::new(),
            all_repos: Vec::new(),
        }
    }

    #[test]
    fn rank_two_of_five_weighs_point_eight() {
        let repo = repo(100, 20, 2, 5);
        assert!((rank_percentage(&repo) - 0.8).abs() < 1e-9);
        assert!((rank_percentage(&repo) * repo.popularity() as f64 - 96.0).abs() < 1e-9);
    }

    #[test]
    fn unranked_repo_weighs_one() {
        assert_eq!(rank_percentage(&repo(10, 0, 0, 0)), 1.0);
    }

    #[test]
    fn last_rank_weighs_one_over_total() {
        assert!((rank_percentage(&repo(10, 0, 4, 4)) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn followers_alone_do_not_qualify() {
        let mut user = user(150);
        user.org_contributed_repos = vec![repo(5, 0, 0, 0)];
        user.externally_contributed_repos = vec![repo(4, 0, 0, 0)];
        let outcome = score_user(&user);
        assert!(!outcome.accepted, "repo score 9 must reject despite followers");
    }

    #[test]
    fn boundary_is_inclusive() {
        let mut user = user(150);
        user.owned_repos = vec![repo(10, 0, 0, 0)];
        assert!(!score_user(&user).accepted, "repo score of exactly 10 must reject");

        user.owned_repos = vec![repo(11, 0, 0, 0)];
        let outcome = score_user(&user);
        assert!(outcome.accepted);
        assert!((outcome.score - 161.0).abs() < 1e-9);
    }

    #[test]
    fn followers_count_toward_accepted_total() {
        let mut user = user(42);
        user.owned_repos = vec![repo(100, 20, 0, 0)];
        user.org_contributed_repos = vec![repo(100, 20, 2, 5)];
        let outcome = score_user(&user);
        assert!(outcome.accepted);
        // 42 + 120 + 0.8 * 120
        assert!((outcome.score - 258.0).abs() < 1e-9);
    }

    #[test]
    fn organizations_are_never_scored() {
        let mut user = user(10_000);
        user.kind = UserKind::Organization;
        user.owned_repos = vec![repo(5000, 100, 0, 0)];
        let outcome = score_user(&user);
        assert!(!outcome.accepted);
        assert_eq!(outcome.score, 0.0);
    }
}
