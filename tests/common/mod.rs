// Shared test fixtures for integration tests
// Functions here are used across different test files
#![allow(dead_code)]

use async_trait::async_trait;
use git2::{Oid, Repository, Signature, Time};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use tracko::error::{SourceError, StoreError};
use tracko::model::{AuthorFilter, CommitMeta, TaggedCommit, TrackedRepository};
use tracko::repository::{CommitIter, CommitLog, CommitSource, Database, RepoMarker, StateStore};

pub const AUTHOR_NAME: &str = "Jane Doe";
pub const AUTHOR_EMAIL: &str = "jane@work.com";
pub const BASE_TIME: i64 = 1_700_000_000;

/// The tracked author used throughout the tests
pub fn author() -> AuthorFilter {
    AuthorFilter::new(AUTHOR_NAME, [AUTHOR_EMAIL])
}

/// Create an in-memory test database with initialized schema
pub async fn create_test_db() -> Database {
    let db = Database::new(":memory:").await.unwrap();
    db.init_schema().await.unwrap();
    db
}

/// Create an empty temporary git repository
pub fn create_test_repo() -> (TempDir, PathBuf, Repository) {
    let dir = TempDir::new().unwrap();
    let repo_path = dir.path().to_path_buf();
    let repo = Repository::init(&repo_path).unwrap();
    (dir, repo_path, repo)
}

/// Create a commit on HEAD with an explicit author, authored and committed at `time`
pub fn commit_as(repo: &Repository, name: &str, email: &str, time: i64, message: &str) -> Oid {
    commit_with_times(repo, name, email, time, time, message)
}

/// Create a commit on HEAD whose author time and committer time differ,
/// as left behind by a rebase or cherry-pick
pub fn commit_with_times(
    repo: &Repository,
    name: &str,
    email: &str,
    authored: i64,
    committed: i64,
    message: &str,
) -> Oid {
    let author = Signature::new(name, email, &Time::new(authored, 0)).unwrap();
    let committer = Signature::new(name, email, &Time::new(committed, 0)).unwrap();

    let tree_id = repo.treebuilder(None).unwrap().write().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    repo.commit(Some("HEAD"), &author, &committer, message, &tree, &parents).unwrap()
}

/// Create `count` commits one second apart starting at `start`
pub fn add_commits(repo: &Repository, name: &str, email: &str, start: i64, count: usize) -> Vec<Oid> {
    (0..count)
        .map(|i| commit_as(repo, name, email, start + i as i64, &format!("{} change {}", name, i)))
        .collect()
}

/// Commit metadata authored by the tracked author
pub fn meta(index: usize, date: i64) -> CommitMeta {
    meta_by(AUTHOR_NAME, AUTHOR_EMAIL, index, date)
}

pub fn meta_by(name: &str, email: &str, index: usize, date: i64) -> CommitMeta {
    CommitMeta {
        author_name: name.to_string(),
        author_email: email.to_string(),
        commit_id: format!("{:040x}", index),
        commit_date: date,
        committed_at: date,
        message: format!("commit {}", index),
    }
}

/// `count` commits by the tracked author, oldest first, one second apart
pub fn metas(count: usize) -> Vec<CommitMeta> {
    (0..count).map(|i| meta(i, BASE_TIME + i as i64)).collect()
}

pub fn tagged(repo_id: i64, metas: Vec<CommitMeta>) -> Vec<TaggedCommit> {
    metas.into_iter().map(|m| TaggedCommit::new(repo_id, m)).collect()
}

#[derive(Clone, Default)]
struct ScriptedRepo {
    commits: Vec<CommitMeta>,
    fail_after: Option<usize>,
}

/// In-memory commit source keyed by canonical directory path
///
/// Records the `since` marker each repository was opened with.
#[derive(Default)]
pub struct ScriptedSource {
    repos: Mutex<HashMap<PathBuf, ScriptedRepo>>,
    seen_since: Arc<Mutex<HashMap<PathBuf, Option<i64>>>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the history of an existing directory
    pub fn add_repo(&self, path: &Path, commits: Vec<CommitMeta>) {
        let key = std::fs::canonicalize(path).unwrap();
        self.repos.lock().unwrap().insert(key, ScriptedRepo { commits, fail_after: None });
    }

    /// Make the history of `path` fail after yielding `count` commits
    pub fn fail_after(&self, path: &Path, count: usize) {
        let key = std::fs::canonicalize(path).unwrap();
        if let Some(repo) = self.repos.lock().unwrap().get_mut(&key) {
            repo.fail_after = Some(count);
        }
    }

    /// The marker the last scan of `path` was started with, if it was scanned
    pub fn since_for(&self, path: &Path) -> Option<Option<i64>> {
        let key = std::fs::canonicalize(path).unwrap();
        self.seen_since.lock().unwrap().get(&key).copied()
    }
}

impl CommitSource for ScriptedSource {
    fn open(&self, path: &Path) -> Result<Box<dyn CommitLog>, SourceError> {
        let repo = self
            .repos
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::Other(format!("not a repository: {}", path.display())))?;

        Ok(Box::new(ScriptedLog {
            path: path.to_path_buf(),
            repo,
            seen_since: Arc::clone(&self.seen_since),
        }))
    }
}

struct ScriptedLog {
    path: PathBuf,
    repo: ScriptedRepo,
    seen_since: Arc<Mutex<HashMap<PathBuf, Option<i64>>>>,
}

impl CommitLog for ScriptedLog {
    fn history<'a>(&'a self, since: Option<i64>, author: &'a AuthorFilter) -> Result<CommitIter<'a>, SourceError> {
        self.seen_since.lock().unwrap().insert(self.path.clone(), since);

        let commits = self
            .repo
            .commits
            .iter()
            .filter(move |c| since.is_none_or(|since| c.committed_at >= since))
            .filter(move |c| author.matches(&c.author_name, &c.author_email))
            .cloned()
            .map(Ok);

        match self.repo.fail_after {
            Some(count) => Ok(Box::new(
                commits
                    .take(count)
                    .chain(std::iter::once(Err(SourceError::Other("scripted read failure".into())))),
            )),
            None => Ok(Box::new(commits)),
        }
    }
}

/// Database wrapper whose `fail_on`-th batch write (1-based) and every
/// later one fails
pub struct FailingStore {
    inner: Database,
    fail_on: usize,
    attempts: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: Database, fail_on: usize) -> Self {
        Self { inner, fail_on, attempts: AtomicUsize::new(0) }
    }

    pub fn inner(&self) -> &Database {
        &self.inner
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for FailingStore {
    async fn get_or_create_tracked_repo(&self, path: &str) -> Result<TrackedRepository, StoreError> {
        self.inner.get_or_create_tracked_repo(path).await
    }

    async fn get_tracked_repo(&self, path: &str) -> Result<Option<TrackedRepository>, StoreError> {
        self.inner.get_tracked_repo(path).await
    }

    async fn get_last_commit_marker(&self, repo_id: i64) -> Result<Option<i64>, StoreError> {
        self.inner.get_last_commit_marker(repo_id).await
    }

    async fn bulk_insert_commits(&self, batch: &[TaggedCommit]) -> Result<u64, StoreError> {
        self.inner.insert_commits(batch).await
    }

    async fn update_last_scanned(&self, repo_id: i64, timestamp: i64) -> Result<(), StoreError> {
        self.inner.update_last_scanned(repo_id, timestamp).await
    }

    async fn complete_scans(&self, repo_ids: &[i64]) -> Result<(), StoreError> {
        self.inner.complete_scans(repo_ids).await
    }

    async fn apply_batch(&self, batch: &[TaggedCommit], markers: &[RepoMarker]) -> Result<u64, StoreError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt >= self.fail_on {
            return Err(StoreError::Query(sqlx::Error::PoolClosed));
        }
        self.inner.apply_commit_batch(batch, markers).await
    }
}

/// Database wrapper that cancels `token` right after its `cancel_after`-th
/// batch write (1-based) is committed
pub struct CancellingStore {
    inner: Database,
    cancel_after: usize,
    token: CancellationToken,
    batches: AtomicUsize,
}

impl CancellingStore {
    pub fn new(inner: Database, cancel_after: usize, token: CancellationToken) -> Self {
        Self { inner, cancel_after, token, batches: AtomicUsize::new(0) }
    }

    pub fn inner(&self) -> &Database {
        &self.inner
    }

    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for CancellingStore {
    async fn get_or_create_tracked_repo(&self, path: &str) -> Result<TrackedRepository, StoreError> {
        self.inner.get_or_create_tracked_repo(path).await
    }

    async fn get_tracked_repo(&self, path: &str) -> Result<Option<TrackedRepository>, StoreError> {
        self.inner.get_tracked_repo(path).await
    }

    async fn get_last_commit_marker(&self, repo_id: i64) -> Result<Option<i64>, StoreError> {
        self.inner.get_last_commit_marker(repo_id).await
    }

    async fn bulk_insert_commits(&self, batch: &[TaggedCommit]) -> Result<u64, StoreError> {
        self.inner.insert_commits(batch).await
    }

    async fn update_last_scanned(&self, repo_id: i64, timestamp: i64) -> Result<(), StoreError> {
        self.inner.update_last_scanned(repo_id, timestamp).await
    }

    async fn complete_scans(&self, repo_ids: &[i64]) -> Result<(), StoreError> {
        self.inner.complete_scans(repo_ids).await
    }

    async fn apply_batch(&self, batch: &[TaggedCommit], markers: &[RepoMarker]) -> Result<u64, StoreError> {
        let inserted = self.inner.apply_commit_batch(batch, markers).await?;
        if self.batches.fetch_add(1, Ordering::SeqCst) + 1 == self.cancel_after {
            self.token.cancel();
        }
        Ok(inserted)
    }
}

/// Canonical store key of a directory, as the scanner records it
pub fn repo_key(path: &Path) -> String {
    std::fs::canonicalize(path).unwrap().to_string_lossy().into_owned()
}
