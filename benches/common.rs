// Shared benchmark helpers
// Functions here are used across different benchmark files
#![allow(dead_code)]

use git2::{Repository, Signature, Time};
use std::path::PathBuf;
use tempfile::TempDir;
use tracko::model::{AuthorFilter, CommitMeta, TaggedCommit};
use tracko::repository::Database;

pub const BENCH_NAME: &str = "Bench User";
pub const BENCH_EMAIL: &str = "bench@example.com";

pub fn bench_author() -> AuthorFilter {
    AuthorFilter::new(BENCH_NAME, [BENCH_EMAIL])
}

/// Generate tagged commits spread over `repos` repositories
pub fn generate_commits(num_commits: usize, repos: i64) -> Vec<TaggedCommit> {
    (0..num_commits)
        .map(|i| TaggedCommit::new(
            (i as i64 % repos) + 1,
            CommitMeta {
                author_name: BENCH_NAME.to_string(),
                author_email: BENCH_EMAIL.to_string(),
                commit_id: format!("{:040x}", i),
                commit_date: 1700000000 + (i as i64),
                committed_at: 1700000000 + (i as i64),
                message: format!("Change number {}\n\nLonger description of change {}", i, i),
            },
        ))
        .collect()
}

/// Create in-memory database with `repos` tracked repositories
pub async fn setup_bench_db(repos: i64) -> Database {
    let db = Database::new(":memory:").await.unwrap();
    db.init_schema().await.unwrap();
    for i in 0..repos {
        db.get_or_create_tracked_repo(&format!("/bench/repo_{}", i)).await.unwrap();
    }
    db
}

/// Create a temporary git repository with `num_commits` commits, every
/// `foreign_every`-th one by another author
pub fn create_bench_repo(num_commits: usize, foreign_every: usize) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let repo_path = dir.path().to_path_buf();
    let repo = Repository::init(&repo_path).unwrap();
    let tree_id = repo.treebuilder(None).unwrap().write().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let mut parent: Option<git2::Commit> = None;
    for i in 0..num_commits {
        let time = Time::new(1700000000 + i as i64, 0);
        let sig = if foreign_every > 0 && i % foreign_every == 0 {
            Signature::new("Someone Else", "else@example.com", &time).unwrap()
        } else {
            Signature::new(BENCH_NAME, BENCH_EMAIL, &time).unwrap()
        };

        let parents: Vec<&git2::Commit> = parent.iter().collect();
        let oid = repo
            .commit(Some("HEAD"), &sig, &sig, &format!("commit {}", i), &tree, &parents)
            .unwrap();
        parent = Some(repo.find_commit(oid).unwrap());
    }

    (dir, repo_path)
}
