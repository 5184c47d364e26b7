/// Commit metadata as produced by a commit source, already author-filtered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMeta {
    pub author_name: String,
    pub author_email: String,
    /// Full hex object id (40 characters for SHA-1 repositories)
    pub commit_id: String,
    /// Author time, Unix seconds
    pub commit_date: i64,
    /// Committer time, Unix seconds; histories are walked and resumed on it
    pub committed_at: i64,
    pub message: String,
}

/// A commit on the shared import stream, tagged with its owning repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedCommit {
    pub repo_id: i64,
    pub meta: CommitMeta,
}

impl TaggedCommit {
    pub fn new(repo_id: i64, meta: CommitMeta) -> Self {
        Self { repo_id, meta }
    }
}

/// A commit as stored in the state database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub id: i64,
    pub repo_id: i64,
    pub commit_id: String,
    pub author_name: String,
    pub author_email: String,
    pub commit_date: i64,
    pub committed_at: i64,
    pub message: String,
    pub exported: bool,
}
