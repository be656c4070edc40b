use habit_core::model::{HabitId, NewProgress, ProgressEntry};

use super::SqliteRepository;
use super::mapping::{id_to_i64, map_progress_row, progress_id_from_i64, write_err};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn append_progress(&self, progress: NewProgress) -> Result<ProgressEntry, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO progress_entries (habit_id, date, value)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(id_to_i64("habit_id", progress.habit_id.value())?)
        .bind(progress.date)
        .bind(progress.value)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        let id = progress_id_from_i64(res.last_insert_rowid())?;
        Ok(progress.assign_id(id))
    }

    async fn list_progress(&self) -> Result<Vec<ProgressEntry>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, habit_id, date, value
            FROM progress_entries
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_progress_row).collect()
    }

    async fn progress_for_habit(
        &self,
        habit_id: HabitId,
    ) -> Result<Vec<ProgressEntry>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, habit_id, date, value
            FROM progress_entries
            WHERE habit_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("habit_id", habit_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_progress_row).collect()
    }
}
