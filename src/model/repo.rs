/// A repository whose history is imported
///
/// Rows are keyed by canonical absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedRepository {
    pub id: i64,
    pub path: String,
    /// Author time of the newest commit durably imported so far
    pub last_scanned: Option<i64>,
    /// Committer time of the newest stored commit as of the last scan that
    /// ran to completion; the next scan starts there
    pub resume_marker: Option<i64>,
}
