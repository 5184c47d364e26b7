//! Import orchestrator
//!
//! Fans N repository scanners into one bounded commit stream drained by a
//! single batch writer.
//!
//! # Shutdown ordering
//!
//! - every scanner holds a clone of the stream sender
//! - a barrier task owns the last sender; it waits for every scanner,
//!   failed or panicked ones included, hands the writer the list of scans
//!   that forwarded their whole history, and only then drops the sender
//! - the writer sees the stream close, flushes the final short batch, marks
//!   those scans complete and exits
//! - the orchestrator drains the error channel after the writer is done

mod batch;
mod errors;
mod scanner;
mod writer;

pub use batch::Batcher;
pub use errors::{ErrorCollector, ErrorSink, error_channel};
pub use scanner::{RepositoryScanner, ScanOutcome};
pub use writer::{BatchWriter, WriteStats, batch_markers};

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::ImportError;
use crate::model::{AuthorFilter, TaggedCommit};
use crate::repository::{CommitSource, Database, GitSource, NoopProgress, ProgressReporter, StateStore};

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Lifecycle of one import run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPhase {
    Idle,
    /// Scanners and the writer are running
    Scanning,
    /// Scanners are done, the writer flushes what is left
    Draining,
    Completed,
    Failed,
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportPhase::Idle => "idle",
            ImportPhase::Scanning => "scanning",
            ImportPhase::Draining => "draining",
            ImportPhase::Completed => "completed",
            ImportPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of an import run
#[derive(Debug)]
pub struct ImportReport {
    pub phase: ImportPhase,
    pub repositories: usize,
    /// Commits forwarded by scanners
    pub scanned: u64,
    pub batches: u64,
    /// Commits newly stored (duplicates excluded)
    pub inserted: u64,
    /// Repositories whose scans were marked complete
    pub completed: u64,
    /// Every error reported by any worker, in reporting order
    pub errors: Vec<ImportError>,
}

impl ImportReport {
    pub fn is_success(&self) -> bool {
        self.phase == ImportPhase::Completed
    }

    /// The first error if the run failed, otherwise the report itself
    pub fn into_result(mut self) -> Result<ImportReport, ImportError> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(self.errors.remove(0))
        }
    }
}

/// Coordinates one import run over a set of repository paths
pub struct Importer<S, C> {
    store: Arc<S>,
    source: Arc<C>,
    author: Arc<AuthorFilter>,
    batch_size: usize,
    channel_capacity: usize,
    cancel: CancellationToken,
    progress: Arc<dyn ProgressReporter>,
}

impl<S, C> Importer<S, C>
where
    S: StateStore + 'static,
    C: CommitSource + 'static,
{
    pub fn new(store: Arc<S>, source: Arc<C>, author: AuthorFilter) -> Self {
        Self {
            store,
            source,
            author: Arc::new(author),
            batch_size: DEFAULT_BATCH_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            cancel: CancellationToken::new(),
            progress: Arc::new(NoopProgress),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Cancelling the token stops every worker at its next suspension point
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Run the import, returning the first reported error on failure
    pub async fn run(&self, repo_paths: &[PathBuf]) -> Result<ImportReport, ImportError> {
        self.run_detailed(repo_paths).await.into_result()
    }

    /// Run the import and return the full report, errors included
    pub async fn run_detailed(&self, repo_paths: &[PathBuf]) -> ImportReport {
        let mut phase = ImportPhase::Idle;
        let (commit_tx, commit_rx) = mpsc::channel::<TaggedCommit>(self.channel_capacity);
        let (errors, collector) = error_channel();
        let (completed_tx, completed_rx) = oneshot::channel::<Vec<i64>>();

        transition(&mut phase, ImportPhase::Scanning);
        tracing::info!(
            "Importing {} repositories (batch size {}, stream capacity {})",
            repo_paths.len(),
            self.batch_size,
            self.channel_capacity
        );

        // Phase 1: One scanner per repository
        let mut scanners = JoinSet::new();
        for path in repo_paths {
            let scanner = RepositoryScanner {
                store: Arc::clone(&self.store),
                source: Arc::clone(&self.source),
                author: Arc::clone(&self.author),
                path: path.clone(),
                commits: commit_tx.clone(),
                cancel: self.cancel.clone(),
            };
            scanners.spawn(scanner.run(errors.clone()));
        }

        // Phase 2: Exactly one writer
        let writer = BatchWriter {
            store: Arc::clone(&self.store),
            batcher: Batcher::new(commit_rx, self.batch_size),
            completed: completed_rx,
            cancel: self.cancel.clone(),
            progress: Arc::clone(&self.progress),
        };
        let writer = tokio::spawn(writer.run(errors.clone()));

        // Phase 3: Barrier, the only place the stream is closed
        let barrier = tokio::spawn({
            let errors = errors.clone();
            async move {
                let mut scanned = 0;
                let mut completed = Vec::new();
                while let Some(joined) = scanners.join_next().await {
                    match joined {
                        Ok(outcome) => {
                            scanned += outcome.forwarded;
                            completed.extend(outcome.completed);
                        }
                        Err(e) => errors.report(ImportError::WorkerPanicked(e.to_string())),
                    }
                }
                // Fails only if the writer is already gone
                let _ = completed_tx.send(completed);
                drop(commit_tx);
                scanned
            }
        });

        let scanned = match barrier.await {
            Ok(scanned) => scanned,
            Err(e) => {
                errors.report(ImportError::WorkerPanicked(e.to_string()));
                0
            }
        };

        transition(&mut phase, ImportPhase::Draining);
        let stats = match writer.await {
            Ok(stats) => stats,
            Err(e) => {
                errors.report(ImportError::WorkerPanicked(e.to_string()));
                WriteStats::default()
            }
        };

        // Phase 4: Collect
        drop(errors);
        let mut reported = collector.drain();
        if self.cancel.is_cancelled() {
            reported.insert(0, ImportError::Cancelled);
        }

        let final_phase = if reported.is_empty() { ImportPhase::Completed } else { ImportPhase::Failed };
        transition(&mut phase, final_phase);

        for err in &reported {
            tracing::error!("Import error: {}", err);
        }
        tracing::info!(
            "Import {}: {} commits scanned, {} new in {} batches, {} errors",
            phase,
            scanned,
            stats.inserted,
            stats.batches,
            reported.len()
        );

        ImportReport {
            phase,
            repositories: repo_paths.len(),
            scanned,
            batches: stats.batches,
            inserted: stats.inserted,
            completed: stats.completed,
            errors: reported,
        }
    }
}

fn transition(phase: &mut ImportPhase, next: ImportPhase) {
    tracing::debug!("Import phase {} -> {}", phase, next);
    *phase = next;
}

/// Import `repo_paths` into the SQLite store at `store_location`
///
/// Uses git repositories as the commit source and default batching. The
/// store is opened and migrated before any worker starts; failing that is
/// `ImportError::StoreUnavailable`.
pub async fn run_import(
    repo_paths: &[PathBuf],
    author: &AuthorFilter,
    store_location: &str,
) -> Result<ImportReport, ImportError> {
    let db = open_store(store_location).await?;
    Importer::new(Arc::new(db), Arc::new(GitSource), author.clone())
        .run(repo_paths)
        .await
}

/// Open and migrate the state database
pub async fn open_store(store_location: &str) -> Result<Database, ImportError> {
    let db = Database::new(store_location)
        .await
        .map_err(ImportError::StoreUnavailable)?;
    db.init_schema().await.map_err(ImportError::StoreUnavailable)?;
    Ok(db)
}
