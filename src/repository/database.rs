use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous},
    Pool, QueryBuilder, Row, Sqlite, Transaction,
};
use std::str::FromStr;
use std::time::Duration;

use crate::error::StoreError;
use crate::model::{CommitRecord, TaggedCommit, TrackedRepository};

use super::store::RepoMarker;
use super::SCHEMA_VERSION;

type Result<T> = std::result::Result<T, StoreError>;

/// Rows per multi-row INSERT. Seven bound columns per row keeps each
/// statement under SQLite's 32766 variable limit.
const INSERT_CHUNK: usize = 4000;

/// Database abstraction for SQLite operations
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection
    ///
    /// `":memory:"` opens a private in-memory database held by a single
    /// connection that is never recycled.
    pub async fn new(db_path: &str) -> Result<Self> {
        let connect_err = |source| StoreError::Connect {
            location: db_path.to_string(),
            source,
        };

        // Configure connection options with PRAGMAs applied to every connection
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", db_path))
            .map_err(connect_err)?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let in_memory = db_path == ":memory:";
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 4 })
            .idle_timeout(if in_memory { None } else { Some(Duration::from_secs(600)) })
            .max_lifetime(if in_memory { None } else { Some(Duration::from_secs(1800)) })
            .connect_with(options)
            .await
            .map_err(connect_err)?;

        Ok(Self { pool })
    }

    /// Create or migrate the schema, returns true if anything changed
    ///
    /// Stored state is never dropped: older versions are migrated forward in
    /// one transaction and an unknown version is an error.
    pub async fn init_schema(&self) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        // Create metadata table first (needed to check version)
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )"
        ).execute(&mut *tx).await?;

        let stored_version: Option<String> =
            sqlx::query_scalar("SELECT value FROM metadata WHERE key = 'schema_version'")
                .fetch_optional(&mut *tx)
                .await?;

        let changed = match stored_version.as_deref() {
            Some(SCHEMA_VERSION) => false,
            None => {
                Self::create_schema(&mut tx).await?;
                true
            }
            Some("1") => {
                tracing::info!("Migrating state database schema 1 -> {}", SCHEMA_VERSION);
                Self::migrate_v1(&mut tx).await?;
                true
            }
            Some(other) => {
                return Err(StoreError::UnsupportedSchema {
                    found: other.to_string(),
                    supported: SCHEMA_VERSION.to_string(),
                });
            }
        };

        if changed {
            sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?)")
                .bind(SCHEMA_VERSION)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(changed)
    }

    async fn create_schema(tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tracked_repos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT NOT NULL UNIQUE,
                last_scanned INTEGER,
                resume_marker INTEGER
            )"
        ).execute(&mut **tx).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS commits (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                repo_id INTEGER NOT NULL REFERENCES tracked_repos(id),
                commit_id TEXT NOT NULL,
                author_name TEXT NOT NULL,
                author_email TEXT NOT NULL,
                commit_date INTEGER NOT NULL,
                committed_at INTEGER NOT NULL,
                message TEXT NOT NULL,
                exported INTEGER NOT NULL DEFAULT 0,
                UNIQUE (repo_id, commit_id)
            )"
        ).execute(&mut **tx).await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_commits_repo_committed ON commits (repo_id, committed_at)")
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Version 1 resumed on author time and had no committer time column.
    /// Its derived marker becomes the stored resume marker.
    async fn migrate_v1(tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
        sqlx::query("ALTER TABLE commits ADD COLUMN committed_at INTEGER NOT NULL DEFAULT 0")
            .execute(&mut **tx)
            .await?;
        sqlx::query("UPDATE commits SET committed_at = commit_date")
            .execute(&mut **tx)
            .await?;
        sqlx::query("ALTER TABLE tracked_repos ADD COLUMN resume_marker INTEGER")
            .execute(&mut **tx)
            .await?;
        sqlx::query(
            "UPDATE tracked_repos SET resume_marker =
                (SELECT MAX(committed_at) FROM commits WHERE commits.repo_id = tracked_repos.id)"
        ).execute(&mut **tx).await?;
        sqlx::query("DROP INDEX IF EXISTS idx_commits_repo_date")
            .execute(&mut **tx)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_commits_repo_committed ON commits (repo_id, committed_at)")
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Get metadata value by key
    pub async fn get_metadata(&self, key: &str) -> Option<String> {
        sqlx::query("SELECT value FROM metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .ok()
            .flatten()
            .map(|row| row.get("value"))
    }

    /// Look up a tracked repository by its canonical path
    pub async fn get_tracked_repo(&self, path: &str) -> Result<Option<TrackedRepository>> {
        let row = sqlx::query("SELECT id, path, last_scanned, resume_marker FROM tracked_repos WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| repo_from_row(&row)))
    }

    /// Insert the repository if absent, then return the stored row
    ///
    /// Concurrent callers for the same path all get the same row.
    pub async fn get_or_create_tracked_repo(&self, path: &str) -> Result<TrackedRepository> {
        sqlx::query("INSERT INTO tracked_repos (path) VALUES (?) ON CONFLICT(path) DO NOTHING")
            .bind(path)
            .execute(&self.pool)
            .await?;

        self.get_tracked_repo(path)
            .await?
            .ok_or_else(|| StoreError::MissingRepository(path.to_string()))
    }

    /// All tracked repositories ordered by path
    pub async fn list_tracked_repos(&self) -> Result<Vec<TrackedRepository>> {
        let rows = sqlx::query("SELECT id, path, last_scanned, resume_marker FROM tracked_repos ORDER BY path")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(repo_from_row).collect())
    }

    /// Committer time a scan of the repository resumes from
    ///
    /// `None` until a scan has completed with all of its commits stored.
    pub async fn get_last_commit_marker(&self, repo_id: i64) -> Result<Option<i64>> {
        let marker: Option<Option<i64>> = sqlx::query_scalar("SELECT resume_marker FROM tracked_repos WHERE id = ?")
            .bind(repo_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(marker.flatten())
    }

    /// Mark the latest scans of `repo_ids` complete: every commit they
    /// forwarded is stored. Their resume markers move to the newest stored
    /// committer time.
    pub async fn complete_scans(&self, repo_ids: &[i64]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for repo_id in repo_ids {
            sqlx::query(
                "UPDATE tracked_repos SET resume_marker = COALESCE(
                    (SELECT MAX(committed_at) FROM commits WHERE repo_id = ?1),
                    resume_marker
                ) WHERE id = ?1"
            )
            .bind(repo_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Total number of stored commits
    pub async fn count_commits(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM commits")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Number of stored commits for one repository
    pub async fn count_repo_commits(&self, repo_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM commits WHERE repo_id = ?")
            .bind(repo_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Stored commits of a repository, newest first
    pub async fn list_commits(&self, repo_id: i64) -> Result<Vec<CommitRecord>> {
        let rows = sqlx::query(
            "SELECT id, repo_id, commit_id, author_name, author_email, commit_date, committed_at, message, exported
             FROM commits WHERE repo_id = ? ORDER BY commit_date DESC, id DESC"
        )
        .bind(repo_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| CommitRecord {
            id: row.get("id"),
            repo_id: row.get("repo_id"),
            commit_id: row.get("commit_id"),
            author_name: row.get("author_name"),
            author_email: row.get("author_email"),
            commit_date: row.get("commit_date"),
            committed_at: row.get("committed_at"),
            message: row.get("message"),
            exported: row.get("exported"),
        }).collect())
    }

    /// Flag commits as exported, returns the number of rows changed
    pub async fn mark_exported(&self, commit_ids: &[i64]) -> Result<u64> {
        if commit_ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut changed = 0;
        for chunk in commit_ids.chunks(INSERT_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "UPDATE commits SET exported = 1 WHERE exported = 0 AND id IN ("
            );
            let mut separated = qb.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            qb.push(")");
            changed += qb.build().execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;
        Ok(changed)
    }

    /// Insert commits, skipping any (repo_id, commit_id) already stored
    ///
    /// Returns the number of rows actually inserted.
    pub async fn insert_commits(&self, commits: &[TaggedCommit]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let inserted = self.insert_commits_in_tx(&mut tx, commits).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    /// Advance a repository's scan marker; it never moves backwards
    pub async fn update_last_scanned(&self, repo_id: i64, timestamp: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        self.update_markers_in_tx(&mut tx, &[RepoMarker { repo_id, last_scanned: timestamp }])
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Apply commits + marker updates in ONE transaction.
    pub async fn apply_commit_batch(&self, commits: &[TaggedCommit], markers: &[RepoMarker]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        // Persist rows
        let inserted = self.insert_commits_in_tx(&mut tx, commits).await?;

        // Advance state
        self.update_markers_in_tx(&mut tx, markers).await?;

        tx.commit().await?;
        Ok(inserted)
    }

    async fn insert_commits_in_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        commits: &[TaggedCommit],
    ) -> Result<u64> {
        let mut inserted = 0;

        for chunk in commits.chunks(INSERT_CHUNK) {
            if chunk.is_empty() {
                continue;
            }

            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT OR IGNORE INTO commits (repo_id, commit_id, author_name, author_email, commit_date, committed_at, message) "
            );
            qb.push_values(chunk, |mut row, commit| {
                row.push_bind(commit.repo_id)
                    .push_bind(commit.meta.commit_id.as_str())
                    .push_bind(commit.meta.author_name.as_str())
                    .push_bind(commit.meta.author_email.as_str())
                    .push_bind(commit.meta.commit_date)
                    .push_bind(commit.meta.committed_at)
                    .push_bind(commit.meta.message.as_str());
            });
            inserted += qb.build().execute(&mut **tx).await?.rows_affected();
        }

        Ok(inserted)
    }

    async fn update_markers_in_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        markers: &[RepoMarker],
    ) -> Result<()> {
        for marker in markers {
            sqlx::query(
                "UPDATE tracked_repos SET last_scanned = MAX(COALESCE(last_scanned, ?1), ?1) WHERE id = ?2"
            )
            .bind(marker.last_scanned)
            .bind(marker.repo_id)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

fn repo_from_row(row: &SqliteRow) -> TrackedRepository {
    TrackedRepository {
        id: row.get("id"),
        path: row.get("path"),
        last_scanned: row.get("last_scanned"),
        resume_marker: row.get("resume_marker"),
    }
}
