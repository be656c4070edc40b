use chrono::NaiveDate;
use habit_core::model::{Habit, HabitId, HabitKind, ValidatedHabit};

use super::SqliteRepository;
use super::mapping::{habit_id_from_i64, id_to_i64, map_habit_row};
use crate::repository::{HabitRepository, StorageError};

const SELECT_HABIT: &str = r"
    SELECT id, name, type, frequency, target, unit, start_date
    FROM habits
";

#[async_trait::async_trait]
impl HabitRepository for SqliteRepository {
    async fn insert_new_habit(
        &self,
        habit: ValidatedHabit,
        start_date: NaiveDate,
    ) -> Result<Habit, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO habits (name, type, frequency, target, unit, start_date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(habit.name.as_str())
        .bind(HabitKind::from(habit.mode).as_str())
        .bind(habit.frequency.as_str())
        .bind(habit.target)
        .bind(habit.unit.as_deref())
        .bind(start_date)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let id = habit_id_from_i64(res.last_insert_rowid())?;
        tracing::debug!(habit_id = %id, "inserted habit");
        Ok(habit.assign_id(id, start_date))
    }

    async fn update_habit(
        &self,
        id: HabitId,
        habit: ValidatedHabit,
    ) -> Result<Habit, StorageError> {
        let res = sqlx::query(
            r"
            UPDATE habits
            SET name = ?2, type = ?3, frequency = ?4, target = ?5, unit = ?6
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("habit_id", id.value())?)
        .bind(habit.name.as_str())
        .bind(HabitKind::from(habit.mode).as_str())
        .bind(habit.frequency.as_str())
        .bind(habit.target)
        .bind(habit.unit.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        self.get_habit(id).await?.ok_or(StorageError::NotFound)
    }

    async fn delete_habit(&self, id: HabitId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM habits WHERE id = ?1")
            .bind(id_to_i64("habit_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        tracing::debug!(habit_id = %id, "deleted habit");
        Ok(())
    }

    async fn get_habit(&self, id: HabitId) -> Result<Option<Habit>, StorageError> {
        let row = sqlx::query(&format!("{SELECT_HABIT} WHERE id = ?1"))
            .bind(id_to_i64("habit_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_habit_row).transpose()
    }

    async fn list_habits(&self) -> Result<Vec<Habit>, StorageError> {
        let rows = sqlx::query(&format!("{SELECT_HABIT} ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        // one unreadable row must not hide every other habit
        Ok(rows
            .iter()
            .filter_map(|row| match map_habit_row(row) {
                Ok(habit) => Some(habit),
                Err(err) => {
                    tracing::warn!(%err, "skipping unreadable habit row");
                    None
                }
            })
            .collect())
    }
}
