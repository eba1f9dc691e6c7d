mod migrations;
mod models;
mod queries;

pub use models::*;
pub use queries::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::info;

/// Format a timestamp the way every `*_at` column stores it.
///
/// Fixed-width UTC with microseconds, so string comparison in SQL orders the
/// same way as time does.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Connections shared by request handlers and the session cleanup worker.
const MAX_CONNECTIONS: u32 = 5;

/// How long a writer waits for the SQLite write lock. Reply inserts, counter
/// bumps, thread deletes and session writes all queue on this one lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle to the board's SQLite store.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the board database at `path`, bring the schema up to
    /// date and confirm the reply write path works.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, a migration fails or
    /// the database refuses writes.
    pub async fn new(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // comments -> posts and sessions -> users cascade on delete
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open board database at {}", path.display()))?;

        migrations::run(&pool).await?;
        info!(path = %path.display(), "Board schema up to date");

        let db = Self { pool };
        db.check_counter_writes(path).await?;
        Ok(db)
    }

    /// Bump a throwaway thread counter inside a transaction and roll it back.
    ///
    /// Opening a read-only file succeeds, so without this the first reply
    /// would be the first thing to fail.
    async fn check_counter_writes(&self, path: &Path) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin write check")?;

        // parent_ref 0 marks top-level posts and never owns a counter
        sqlx::query(
            "INSERT INTO thread_counters (parent_ref, last_sequence) VALUES (0, 0)
             ON CONFLICT(parent_ref) DO NOTHING",
        )
        .execute(&mut *tx)
        .await
        .with_context(|| {
            format!(
                "Board database at {} is not writable; check file and directory permissions",
                path.display()
            )
        })?;

        tx.rollback().await.context("Failed to roll back write check")?;
        Ok(())
    }

    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
