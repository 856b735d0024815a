//! Per-run user snapshot. Completed users are written after each one
//! finishes so an interrupted run resumes without re-fetching or
//! re-scoring them.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use devrank::api::Result;
use devrank::model::GitHubUser;

pub fn load(path: &Path) -> Result<HashMap<String, GitHubUser>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading snapshot {}", path.display()))?;
    let users = serde_json::from_str(&contents)
        .with_context(|| format!("parsing snapshot {}", path.display()))?;
    Ok(users)
}

pub fn save(path: &Path, users: &HashMap<String, GitHubUser>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating snapshot dir {}", parent.display()))?;
    }
    let json = serde_json::to_string(users).context("serializing user snapshot")?;
    let temp = path.with_extension("tmp");
    let mut file =
        fs::File::create(&temp).with_context(|| format!("creating {}", temp.display()))?;
    file.write_all(json.as_bytes())
        .and_then(|_| file.sync_all())
        .with_context(|| format!("writing {}", temp.display()))?;
    fs::rename(&temp, path).with_context(|| format!("renaming into {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use devrank::api::{UserDetail, UserKind};
    use tempfile::TempDir;

    #[test]
    fn roundtrip_preserves_users() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        let mut user = GitHubUser::from_detail(UserDetail {
            login: "dev".to_string(),
            name: Some("Dev".to_string()),
            location: Some("Mars".to_string()),
            followers: 7,
            public_repos: 3,
            kind: UserKind::User,
        });
        user.score = 123.5;
        user.accepted = true;
        let mut users = HashMap::new();
        users.insert(user.login.clone(), user.clone());

        save(&path, &users).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.get("dev"), Some(&user));
    }

    #[test]
    fn missing_snapshot_loads_empty() {
        let dir = TempDir::new().unwrap();
        let loaded = load(&dir.path().join("users.json")).unwrap();
        assert!(loaded.is_empty());
    }
}
