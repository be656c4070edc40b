#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod habit_service;
pub mod progress_service;
pub mod streaks;
pub mod token;

pub use habit_core::Clock;

pub use app_services::AppServices;
pub use config::TrackerConfig;
pub use dashboard::{DashboardService, RefreshReport, Snapshot};
pub use error::{
    AppServicesError, ConfigError, HabitServiceError, ProgressServiceError, RefreshError,
    StatsServiceError, TokenStoreError,
};
pub use habit_service::HabitService;
pub use progress_service::ProgressService;
pub use streaks::StatsService;
pub use token::{InMemoryTokenStore, TokenStore};
