use chrono::Utc;
use habit_core::model::{HabitId, StreakMap};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{habit_id_from_i64, id_to_i64, ser, streak_from_i64, write_err};
use crate::repository::{StatsRepository, StorageError};

#[async_trait::async_trait]
impl StatsRepository for SqliteRepository {
    async fn streaks(&self) -> Result<StreakMap, StorageError> {
        let rows = sqlx::query("SELECT habit_id, streak FROM habit_streaks")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut streaks = StreakMap::new();
        for row in rows {
            let habit_id = habit_id_from_i64(row.try_get::<i64, _>("habit_id").map_err(ser)?)?;
            let streak = streak_from_i64(row.try_get::<i64, _>("streak").map_err(ser)?)?;
            streaks.insert(habit_id, streak);
        }
        Ok(streaks)
    }

    async fn set_streak(&self, habit_id: HabitId, streak: u32) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO habit_streaks (habit_id, streak, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(habit_id) DO UPDATE SET
                streak = excluded.streak,
                updated_at = excluded.updated_at
            ",
        )
        .bind(id_to_i64("habit_id", habit_id.value())?)
        .bind(i64::from(streak))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(())
    }
}
