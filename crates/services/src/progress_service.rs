use std::sync::Arc;

use habit_core::model::{HabitId, ProgressDraft, ProgressEntry};
use storage::repository::{HabitRepository, ProgressRepository, StorageError};

use crate::Clock;
use crate::error::ProgressServiceError;
use crate::streaks::StatsService;

/// Appends validated progress to existing habits and keeps their streaks
/// current.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    habits: Arc<dyn HabitRepository>,
    progress: Arc<dyn ProgressRepository>,
    streaks: StatsService,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        habits: Arc<dyn HabitRepository>,
        progress: Arc<dyn ProgressRepository>,
        streaks: StatsService,
    ) -> Self {
        Self {
            clock,
            habits,
            progress,
            streaks,
        }
    }

    /// Log a progress event. A missing date means today.
    ///
    /// The habit's streak is recomputed afterwards; a failure there is logged
    /// and does not undo the entry.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Progress` if the value or date is invalid,
    /// `ProgressServiceError::HabitNotFound` if the habit does not exist, and
    /// `ProgressServiceError::Storage` if persistence fails.
    pub async fn log_progress(
        &self,
        draft: ProgressDraft,
    ) -> Result<ProgressEntry, ProgressServiceError> {
        let habit_id = draft.habit_id;
        let progress = draft.validate(self.clock.today())?;

        let Some(habit) = self.habits.get_habit(habit_id).await? else {
            return Err(ProgressServiceError::HabitNotFound(habit_id));
        };

        // The habit can still vanish between the check and the insert.
        let entry = self
            .progress
            .append_progress(progress)
            .await
            .map_err(|err| match err {
                StorageError::NotFound => ProgressServiceError::HabitNotFound(habit_id),
                other => ProgressServiceError::Storage(other),
            })?;
        tracing::debug!(
            habit_id = %habit_id,
            progress_id = %entry.id(),
            value = progress.value,
            "logged progress"
        );

        if let Err(err) = self.streaks.recompute(&habit).await {
            tracing::warn!(habit_id = %habit_id, %err, "streak not updated after logging");
        }
        Ok(entry)
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn progress_for_habit(
        &self,
        habit_id: HabitId,
    ) -> Result<Vec<ProgressEntry>, ProgressServiceError> {
        Ok(self.progress.progress_for_habit(habit_id).await?)
    }
}
