//! State store trait for persistence abstraction
//!
//! Decouples the import pipeline from database implementation details.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{TaggedCommit, TrackedRepository};

/// New scan marker for one repository, written after its commits are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepoMarker {
    pub repo_id: i64,
    pub last_scanned: i64,
}

/// Persistence layer for import state
///
/// Scanners only read (plus one idempotent repository insert); the batch
/// writer is the only caller of the write methods.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the tracked repository for `path`, creating it if absent
    ///
    /// Must be a no-op on conflict and return the authoritative row.
    async fn get_or_create_tracked_repo(&self, path: &str) -> Result<TrackedRepository, StoreError>;

    /// Look up a tracked repository without creating it
    async fn get_tracked_repo(&self, path: &str) -> Result<Option<TrackedRepository>, StoreError>;

    /// Committer time the next scan of a repository starts from
    ///
    /// Only a scan whose commits were all stored may move it, so a run that
    /// stopped part way never causes unstored commits to be skipped.
    async fn get_last_commit_marker(&self, repo_id: i64) -> Result<Option<i64>, StoreError>;

    /// Insert commits, silently skipping those already stored
    ///
    /// Returns the number of rows actually inserted.
    async fn bulk_insert_commits(&self, batch: &[TaggedCommit]) -> Result<u64, StoreError>;

    /// Advance a repository's `last_scanned` marker
    async fn update_last_scanned(&self, repo_id: i64, timestamp: i64) -> Result<(), StoreError>;

    /// Record that every commit forwarded by the latest scan of each
    /// repository is stored, moving their resume markers forward
    async fn complete_scans(&self, repo_ids: &[i64]) -> Result<(), StoreError>;

    /// Store a batch and then advance its markers, atomically if the store supports it.
    ///
    /// Default implementation is NOT atomic: it inserts rows then updates markers.
    /// Database-backed stores should override this to do it in one transaction.
    async fn apply_batch(&self, batch: &[TaggedCommit], markers: &[RepoMarker]) -> Result<u64, StoreError> {
        let inserted = self.bulk_insert_commits(batch).await?;
        for marker in markers {
            self.update_last_scanned(marker.repo_id, marker.last_scanned).await?;
        }
        Ok(inserted)
    }
}
