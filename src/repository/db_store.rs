//! Database implementation of StateStore

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{TaggedCommit, TrackedRepository};

use super::database::Database;
use super::store::{RepoMarker, StateStore};

#[async_trait]
impl StateStore for Database {
    async fn get_or_create_tracked_repo(&self, path: &str) -> Result<TrackedRepository, StoreError> {
        Database::get_or_create_tracked_repo(self, path).await
    }

    async fn get_tracked_repo(&self, path: &str) -> Result<Option<TrackedRepository>, StoreError> {
        Database::get_tracked_repo(self, path).await
    }

    async fn get_last_commit_marker(&self, repo_id: i64) -> Result<Option<i64>, StoreError> {
        Database::get_last_commit_marker(self, repo_id).await
    }

    async fn bulk_insert_commits(&self, batch: &[TaggedCommit]) -> Result<u64, StoreError> {
        if batch.is_empty() {
            return Ok(0);
        }
        self.insert_commits(batch).await
    }

    async fn update_last_scanned(&self, repo_id: i64, timestamp: i64) -> Result<(), StoreError> {
        Database::update_last_scanned(self, repo_id, timestamp).await
    }

    async fn complete_scans(&self, repo_ids: &[i64]) -> Result<(), StoreError> {
        if repo_ids.is_empty() {
            return Ok(());
        }
        Database::complete_scans(self, repo_ids).await
    }

    async fn apply_batch(&self, batch: &[TaggedCommit], markers: &[RepoMarker]) -> Result<u64, StoreError> {
        self.apply_commit_batch(batch, markers).await
    }
}
