//! Persistence for habits, progress and streaks.
//!
//! `repository` holds the traits and an in-memory backend; `sqlite` the
//! sqlx-backed one.

pub mod repository;
pub mod sqlite;

pub use repository::{Storage, StorageError};
