use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::config::TrackerConfig;
use crate::dashboard::DashboardService;
use crate::error::{AppServicesError, TokenStoreError};
use crate::habit_service::HabitService;
use crate::progress_service::ProgressService;
use crate::streaks::StatsService;
use crate::token::{InMemoryTokenStore, TokenStore};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    config: TrackerConfig,
    habits: Arc<HabitService>,
    progress: Arc<ProgressService>,
    stats: Arc<StatsService>,
    dashboard: Arc<DashboardService>,
    tokens: Arc<dyn TokenStore>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage at `config.db_url`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(config: TrackerConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        Ok(Self::from_storage(config, clock, &storage))
    }

    /// Build services over an empty in-memory backend.
    #[must_use]
    pub fn new_in_memory(config: TrackerConfig, clock: Clock) -> Self {
        Self::from_storage(config, clock, &Storage::in_memory())
    }

    #[must_use]
    pub fn from_storage(config: TrackerConfig, clock: Clock, storage: &Storage) -> Self {
        let habits = Arc::new(HabitService::new(clock, Arc::clone(&storage.habits)));
        let stats = StatsService::new(
            clock,
            Arc::clone(&storage.habits),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.stats),
        );
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.habits),
            Arc::clone(&storage.progress),
            stats.clone(),
        ));
        let dashboard = Arc::new(
            DashboardService::new(
                clock,
                config.window_policy,
                Arc::clone(&storage.habits),
                Arc::clone(&storage.progress),
                Arc::clone(&storage.stats),
            )
            .with_server_completion(config.server_completion),
        );
        let tokens: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new(clock));

        Self {
            config,
            habits,
            progress,
            stats: Arc::new(stats),
            dashboard,
            tokens,
        }
    }

    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    #[must_use]
    pub fn habits(&self) -> Arc<HabitService> {
        Arc::clone(&self.habits)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn stats(&self) -> Arc<StatsService> {
        Arc::clone(&self.stats)
    }

    #[must_use]
    pub fn dashboard(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboard)
    }

    #[must_use]
    pub fn tokens(&self) -> Arc<dyn TokenStore> {
        Arc::clone(&self.tokens)
    }

    /// Store a freshly issued token with the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns `TokenStoreError` if the token store is unavailable.
    pub fn remember_token(&self, token: String) -> Result<(), TokenStoreError> {
        self.tokens.set_token(token, self.config.token_ttl)
    }
}
