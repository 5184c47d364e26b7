//! Commit source abstraction
//!
//! A source opens a repository and yields its author-filtered commit
//! metadata lazily. Sources are blocking; the scanner drives them on the
//! blocking thread pool.

use std::path::Path;

use crate::error::SourceError;
use crate::model::{AuthorFilter, CommitMeta};

/// Lazy, finite, forward-only commit sequence
pub type CommitIter<'a> = Box<dyn Iterator<Item = Result<CommitMeta, SourceError>> + 'a>;

/// An opened repository. Dropping it closes the handle.
pub trait CommitLog: Send {
    /// Commits authored by `author`, skipping those committed before `since`
    ///
    /// `since` is a committer time and is inclusive: a commit committed at
    /// exactly the marker is yielded again and deduplicated by the store.
    /// Sources yield oldest first.
    fn history<'a>(&'a self, since: Option<i64>, author: &'a AuthorFilter) -> Result<CommitIter<'a>, SourceError>;
}

/// Factory for opened repositories
pub trait CommitSource: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn CommitLog>, SourceError>;
}
