mod database;
mod db_store;
mod git_source;
mod progress;
mod source;
mod store;

pub use database::Database;
pub use git_source::{GitSource, is_git_repository};
pub use progress::{IndicatifProgress, NoopProgress, ProgressHandle, ProgressReporter, VerboseProgress};
pub use source::{CommitIter, CommitLog, CommitSource};
pub use store::{RepoMarker, StateStore};

// Re-export the schema version for callers who need it
pub const SCHEMA_VERSION: &str = "2";
