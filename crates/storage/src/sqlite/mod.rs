//! `SQLite` backend for habits, their progress log and streak counts.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{HabitRepository, ProgressRepository, StatsRepository, Storage};

mod habit_repo;
mod mapping;
mod migrate;
mod progress_repo;
mod stats_repo;

/// One user's habit data is small; a handful of connections covers the
/// dashboard's concurrent refresh.
const MAX_CONNECTIONS: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Implements every repository trait over a single pool.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Open (creating if needed) the database at `database_url`.
    ///
    /// Foreign keys are enforced on every connection, since deleting a habit
    /// relies on `ON DELETE CASCADE` to drop its progress and streak. A
    /// private `:memory:` database exists per connection, so it is pinned to a
    /// single connection that is never recycled.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the URL is invalid or the database cannot
    /// be opened.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool_options = if is_private_memory(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
        };

        let pool = pool_options
            .acquire_timeout(BUSY_TIMEOUT)
            .connect_with(options)
            .await?;
        tracing::debug!(database_url, "opened habit database");
        Ok(Self { pool })
    }

    /// Apply pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if a migration query fails.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

/// `sqlite::memory:` style URLs; shared-cache `file:` URLs are excluded.
fn is_private_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") && !database_url.contains("cache=shared")
}

impl Storage {
    /// Connect, migrate and expose one `SQLite` database through every
    /// repository trait.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or migrated.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        Ok(Self {
            habits: Arc::new(repo.clone()) as Arc<dyn HabitRepository>,
            progress: Arc::new(repo.clone()) as Arc<dyn ProgressRepository>,
            stats: Arc::new(repo) as Arc<dyn StatsRepository>,
        })
    }
}
