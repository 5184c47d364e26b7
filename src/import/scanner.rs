//! Per-repository scanner
//!
//! Resolves the repository, reads its resumption marker, then drives the
//! commit source to completion on the blocking pool, forwarding every
//! commit onto the shared stream.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{ImportError, SourceError, StoreError};
use crate::model::{AuthorFilter, TaggedCommit};
use crate::repository::{CommitLog, CommitSource, StateStore};

use super::errors::ErrorSink;

/// What one scanner achieved
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Commits put on the stream
    pub forwarded: u64,
    /// Repository id, set only when its whole history was forwarded
    pub completed: Option<i64>,
}

/// Scanner for one tracked repository path
pub struct RepositoryScanner<S, C> {
    pub(crate) store: Arc<S>,
    pub(crate) source: Arc<C>,
    pub(crate) author: Arc<AuthorFilter>,
    pub(crate) path: PathBuf,
    pub(crate) commits: mpsc::Sender<TaggedCommit>,
    pub(crate) cancel: CancellationToken,
}

impl<S, C> RepositoryScanner<S, C>
where
    S: StateStore + 'static,
    C: CommitSource + 'static,
{
    /// Scan and report any failure to `errors`
    pub async fn run(self, errors: ErrorSink) -> ScanOutcome {
        match self.scan().await {
            Ok(outcome) => outcome,
            Err(err) => {
                errors.report(err);
                ScanOutcome::default()
            }
        }
    }

    /// Scan the repository
    ///
    /// Cancellation ends the scan early without an error; the orchestrator
    /// reports it once for the whole run.
    pub async fn scan(self) -> Result<ScanOutcome, ImportError> {
        let Self { store, source, author, path, commits, cancel } = self;

        // Phase 1: Resolve path and open the repository
        let (canonical, log) = {
            let source = Arc::clone(&source);
            let open_path = path.clone();
            tokio::task::spawn_blocking(move || open_repository(source.as_ref(), &open_path))
                .await
                .map_err(|e| ImportError::WorkerPanicked(e.to_string()))?
                .map_err(|source| ImportError::RepositoryOpen { path: path.clone(), source })?
        };

        // Phase 2: Find or create the tracked repository and its marker
        let repo_key = canonical.to_string_lossy().into_owned();
        let lookup = async {
            let repo = store.get_or_create_tracked_repo(&repo_key).await?;
            let since = store.get_last_commit_marker(repo.id).await?;
            Ok::<_, StoreError>((repo, since))
        };
        let (repo, since) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Scan of {} cancelled before it started", repo_key);
                return Ok(ScanOutcome::default());
            }
            found = lookup => found.map_err(|source| ImportError::RepositoryLookup {
                path: canonical.clone(),
                source,
            })?,
        };

        match since {
            Some(marker) => tracing::info!("Scanning {} (repo {}) since {}", repo_key, repo.id, marker),
            None => tracing::info!("Scanning {} (repo {}) from the beginning", repo_key, repo.id),
        }

        // Phase 3: Forward history onto the shared stream
        let repo_id = repo.id;
        let (forwarded, finished) = tokio::task::spawn_blocking(move || {
            forward_history(log, since, &author, repo_id, &commits, &cancel)
        })
        .await
        .map_err(|e| ImportError::WorkerPanicked(e.to_string()))?
        .map_err(|source| ImportError::SourceRead { path: canonical.clone(), source })?;

        tracing::debug!("Forwarded {} commits from {}", forwarded, repo_key);
        Ok(ScanOutcome {
            forwarded,
            completed: finished.then_some(repo_id),
        })
    }
}

fn open_repository(source: &dyn CommitSource, path: &Path) -> Result<(PathBuf, Box<dyn CommitLog>), SourceError> {
    if path.as_os_str().is_empty() {
        return Err(SourceError::EmptyPath);
    }
    let canonical = std::fs::canonicalize(path).map_err(|source| SourceError::Path {
        path: path.to_path_buf(),
        source,
    })?;
    let log = source.open(&canonical)?;
    Ok((canonical, log))
}

/// Blocking loop: one commit at a time, no buffering beyond the channel
///
/// Returns the number of commits forwarded and whether the history was
/// forwarded to the end.
fn forward_history(
    log: Box<dyn CommitLog>,
    since: Option<i64>,
    author: &AuthorFilter,
    repo_id: i64,
    commits: &mpsc::Sender<TaggedCommit>,
    cancel: &CancellationToken,
) -> Result<(u64, bool), SourceError> {
    let mut forwarded = 0;

    for meta in log.history(since, author)? {
        if cancel.is_cancelled() {
            tracing::debug!("Scan of repo {} cancelled after {} commits", repo_id, forwarded);
            return Ok((forwarded, false));
        }

        // Blocks while the stream is full
        if commits.blocking_send(TaggedCommit::new(repo_id, meta?)).is_err() {
            tracing::debug!("Commit stream closed, stopping scan of repo {}", repo_id);
            return Ok((forwarded, false));
        }
        forwarded += 1;
    }

    Ok((forwarded, true))
}
