use std::sync::Arc;

use habit_core::model::{Habit, HabitDraft, HabitId};
use storage::repository::HabitRepository;

use crate::Clock;
use crate::error::HabitServiceError;

/// Validates habit edits and persists them.
#[derive(Clone)]
pub struct HabitService {
    clock: Clock,
    habits: Arc<dyn HabitRepository>,
}

impl HabitService {
    #[must_use]
    pub fn new(clock: Clock, habits: Arc<dyn HabitRepository>) -> Self {
        Self { clock, habits }
    }

    /// Validate a draft and store it as a new habit starting today.
    ///
    /// # Errors
    ///
    /// Returns `HabitServiceError::Habit` for validation failures.
    /// Returns `HabitServiceError::Storage` if persistence fails.
    pub async fn create_habit(&self, draft: HabitDraft) -> Result<Habit, HabitServiceError> {
        let validated = draft.validate()?;
        let habit = self
            .habits
            .insert_new_habit(validated, self.clock.today())
            .await?;
        tracing::info!(habit_id = %habit.id(), name = habit.name(), "created habit");
        Ok(habit)
    }

    /// Replace every editable field of an existing habit.
    ///
    /// # Errors
    ///
    /// Returns `HabitServiceError::Habit` if validation fails.
    /// Returns `HabitServiceError::Storage` if the habit is missing or
    /// repository access fails.
    pub async fn update_habit(
        &self,
        id: HabitId,
        draft: HabitDraft,
    ) -> Result<Habit, HabitServiceError> {
        let validated = draft.validate()?;
        let habit = self.habits.update_habit(id, validated).await?;
        tracing::info!(habit_id = %id, "updated habit");
        Ok(habit)
    }

    /// Delete a habit along with its progress log and streak.
    ///
    /// # Errors
    ///
    /// Returns `HabitServiceError::Storage` if the habit is missing or
    /// repository access fails.
    pub async fn delete_habit(&self, id: HabitId) -> Result<(), HabitServiceError> {
        self.habits.delete_habit(id).await?;
        tracing::info!(habit_id = %id, "deleted habit");
        Ok(())
    }

    /// Fetch a habit by ID.
    ///
    /// Returns `Ok(None)` when the habit does not exist.
    ///
    /// # Errors
    ///
    /// Returns `HabitServiceError::Storage` if repository access fails.
    pub async fn get_habit(&self, id: HabitId) -> Result<Option<Habit>, HabitServiceError> {
        Ok(self.habits.get_habit(id).await?)
    }

    /// # Errors
    ///
    /// Returns `HabitServiceError::Storage` if repository access fails.
    pub async fn list_habits(&self) -> Result<Vec<Habit>, HabitServiceError> {
        Ok(self.habits.list_habits().await?)
    }
}
