//! Shared error types for the services crate.

use thiserror::Error;

use habit_core::model::{HabitError, HabitId, ProgressError};
use habit_core::window::UnknownWindowPolicy;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `HabitService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HabitServiceError {
    #[error(transparent)]
    Habit(#[from] HabitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error("habit {0} does not exist")]
    HabitNotFound(HabitId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `StatsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatsServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failure of one source during a dashboard refresh.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RefreshError {
    #[error("failed to refresh habits")]
    Habits(#[source] StorageError),
    #[error("failed to refresh progress")]
    Progress(#[source] StorageError),
    #[error("failed to refresh stats")]
    Stats(#[source] StorageError),
}

/// Errors emitted by `TokenStore` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TokenStoreError {
    #[error("token store lock poisoned: {0}")]
    Poisoned(String),
}

/// Invalid values in the tracker configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("HABIT_DB_URL must not be empty")]
    EmptyDbUrl,
    #[error(transparent)]
    WindowPolicy(#[from] UnknownWindowPolicy),
    #[error("invalid token ttl (expected whole seconds): {raw}")]
    InvalidTokenTtl { raw: String },
    #[error("invalid {key} (expected true or false): {raw}")]
    InvalidSwitch { key: &'static str, raw: String },
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
