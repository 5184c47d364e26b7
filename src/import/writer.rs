//! Single consumer of the commit stream
//!
//! Persists fixed-size batches and advances each repository's marker only
//! after the batch holding its commits is stored. Once the stream has been
//! drained, scans that forwarded their whole history are marked complete,
//! which is what moves their resume markers.

use rustc_hash::FxHashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::ImportError;
use crate::model::TaggedCommit;
use crate::repository::{ProgressHandle, ProgressReporter, RepoMarker, StateStore};

use super::batch::Batcher;
use super::errors::ErrorSink;

/// Counters reported by the batch writer
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteStats {
    pub batches: u64,
    pub received: u64,
    pub inserted: u64,
    /// Repositories whose scans were marked complete
    pub completed: u64,
}

pub struct BatchWriter<S> {
    pub(crate) store: Arc<S>,
    pub(crate) batcher: Batcher<TaggedCommit>,
    /// Repositories whose scanners forwarded everything, sent before the
    /// stream closes
    pub(crate) completed: oneshot::Receiver<Vec<i64>>,
    pub(crate) cancel: CancellationToken,
    pub(crate) progress: Arc<dyn ProgressReporter>,
}

impl<S: StateStore + 'static> BatchWriter<S> {
    /// Drain the stream until it closes, the run is cancelled or a batch fails
    ///
    /// A failed batch is reported and stops the writer; the stream is closed
    /// so scanners stop producing. Scans are only marked complete after a
    /// full drain.
    pub async fn run(mut self, errors: ErrorSink) -> WriteStats {
        let mut stats = WriteStats::default();
        let pb = self.progress.start("Importing");

        let result = match self.drain(&mut stats, pb.as_ref()).await {
            Ok(true) => self.complete_scans(&mut stats).await,
            Ok(false) => Ok(()),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            self.batcher.close();
            errors.report(err);
        }

        pb.finish();
        tracing::info!(
            "Batch writer done: {} batches, {} commits received, {} new, {} scans complete",
            stats.batches,
            stats.received,
            stats.inserted,
            stats.completed
        );
        stats
    }

    /// Returns true once the stream is closed and every batch is stored
    async fn drain(
        &mut self,
        stats: &mut WriteStats,
        pb: &dyn ProgressHandle,
    ) -> Result<bool, ImportError> {
        loop {
            let batch = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                batch = self.batcher.next_batch() => batch,
            };
            let Some(batch) = batch else { return Ok(true) };

            let markers = batch_markers(&batch);
            let inserted = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                result = self.store.apply_batch(&batch, &markers) => {
                    result.map_err(ImportError::Persistence)?
                }
            };

            stats.batches += 1;
            stats.received += batch.len() as u64;
            stats.inserted += inserted;
            pb.inc(batch.len() as u64);
            pb.set_message(format!("{} new", stats.inserted));

            tracing::debug!(
                "Stored batch {}: {} commits ({} new) across {} repositories",
                stats.batches,
                batch.len(),
                inserted,
                markers.len()
            );
        }

        tracing::info!("Batch writer cancelled after {} batches", stats.batches);
        self.batcher.close();
        Ok(false)
    }

    async fn complete_scans(&mut self, stats: &mut WriteStats) -> Result<(), ImportError> {
        // The barrier sends before closing the stream; an error means it died
        let Ok(repo_ids) = (&mut self.completed).await else {
            tracing::warn!("No scan completion list received, resume markers unchanged");
            return Ok(());
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(()),
            result = self.store.complete_scans(&repo_ids) => result.map_err(ImportError::Persistence)?,
        }
        stats.completed = repo_ids.len() as u64;
        Ok(())
    }
}

/// Newest commit time per repository in a batch, ordered by repo id
pub fn batch_markers(batch: &[TaggedCommit]) -> Vec<RepoMarker> {
    let mut newest: FxHashMap<i64, i64> = FxHashMap::default();
    for commit in batch {
        newest
            .entry(commit.repo_id)
            .and_modify(|ts| *ts = (*ts).max(commit.meta.commit_date))
            .or_insert(commit.meta.commit_date);
    }

    let mut markers: Vec<RepoMarker> = newest
        .into_iter()
        .map(|(repo_id, last_scanned)| RepoMarker { repo_id, last_scanned })
        .collect();
    markers.sort_by_key(|m| m.repo_id);
    markers
}
