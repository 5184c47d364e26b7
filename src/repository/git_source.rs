use git2::{ErrorCode, Repository, Sort};
use std::path::Path;

use crate::error::SourceError;
use crate::model::{AuthorFilter, CommitMeta};

use super::source::{CommitIter, CommitLog, CommitSource};

/// Check whether `path` opens as a git repository
pub fn is_git_repository(path: &Path) -> bool {
    Repository::open(path).is_ok()
}

/// Commit source backed by libgit2
#[derive(Debug, Default, Clone, Copy)]
pub struct GitSource;

impl CommitSource for GitSource {
    fn open(&self, path: &Path) -> Result<Box<dyn CommitLog>, SourceError> {
        let repo = Repository::open(path)?;
        tracing::debug!("Opened git repository at: {}", path.display());
        Ok(Box::new(GitLog { repo }))
    }
}

struct GitLog {
    repo: Repository,
}

impl CommitLog for GitLog {
    fn history<'a>(&'a self, since: Option<i64>, author: &'a AuthorFilter) -> Result<CommitIter<'a>, SourceError> {
        // Committer time, oldest first; `since` is on the same clock
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME | Sort::REVERSE)?;

        // An unborn HEAD has no history yet
        match revwalk.push_head() {
            Ok(()) => {}
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                tracing::debug!("Repository has no HEAD commit: {}", e.message());
                return Ok(Box::new(std::iter::empty()));
            }
            Err(e) => return Err(e.into()),
        }

        let repo = &self.repo;
        let commits = revwalk.filter_map(move |oid| {
            let commit = match oid.and_then(|oid| repo.find_commit(oid)) {
                Ok(commit) => commit,
                Err(e) => return Some(Err(SourceError::from(e))),
            };

            // Clock skew makes the walk only roughly time ordered, so older
            // commits are skipped rather than ending the walk
            let committed_at = commit.time().seconds();
            if since.is_some_and(|since| committed_at < since) {
                return None;
            }

            let signature = commit.author();
            let commit_date = signature.when().seconds();

            // Non UTF-8 identities can never match the configured author
            let (Some(name), Some(email)) = (signature.name(), signature.email()) else {
                return None;
            };
            if !author.matches(name, email) {
                return None;
            }

            Some(Ok(CommitMeta {
                author_name: name.to_string(),
                author_email: email.to_string(),
                commit_id: commit.id().to_string(),
                commit_date,
                committed_at,
                message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
            }))
        });

        Ok(Box::new(commits))
    }
}
