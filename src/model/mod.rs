mod author;
mod commit;
mod repo;

pub use author::AuthorFilter;
pub use commit::{CommitMeta, CommitRecord, TaggedCommit};
pub use repo::TrackedRepository;
