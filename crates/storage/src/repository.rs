use async_trait::async_trait;
use chrono::NaiveDate;
use habit_core::model::{
    Habit, HabitId, NewProgress, ProgressEntry, ProgressId, StreakMap, ValidatedHabit,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for habits.
#[async_trait]
pub trait HabitRepository: Send + Sync {
    /// Store a new habit and assign its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the habit cannot be stored.
    async fn insert_new_habit(
        &self,
        habit: ValidatedHabit,
        start_date: NaiveDate,
    ) -> Result<Habit, StorageError>;

    /// Replace every editable field of an existing habit.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the habit does not exist.
    async fn update_habit(&self, id: HabitId, habit: ValidatedHabit)
    -> Result<Habit, StorageError>;

    /// Delete a habit together with its progress and streak.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the habit does not exist.
    async fn delete_habit(&self, id: HabitId) -> Result<(), StorageError>;

    /// Fetch a habit by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_habit(&self, id: HabitId) -> Result<Option<Habit>, StorageError>;

    /// List all habits ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_habits(&self) -> Result<Vec<Habit>, StorageError>;
}

/// Append-only progress log.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Append a progress entry and assign its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the habit does not exist.
    async fn append_progress(&self, progress: NewProgress) -> Result<ProgressEntry, StorageError>;

    /// Every stored entry, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_progress(&self) -> Result<Vec<ProgressEntry>, StorageError>;

    /// Entries of one habit, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn progress_for_habit(&self, habit_id: HabitId)
    -> Result<Vec<ProgressEntry>, StorageError>;
}

/// Streak counts maintained by the stats collaborator.
#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn streaks(&self) -> Result<StreakMap, StorageError>;

    /// Record the current streak of a habit.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the habit does not exist.
    async fn set_streak(&self, habit_id: HabitId, streak: u32) -> Result<(), StorageError>;
}

#[derive(Default)]
struct MemoryState {
    habits: BTreeMap<HabitId, Habit>,
    progress: BTreeMap<ProgressId, ProgressEntry>,
    streaks: HashMap<HabitId, u32>,
    next_habit_id: u64,
    next_progress_id: u64,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl HabitRepository for InMemoryRepository {
    async fn insert_new_habit(
        &self,
        habit: ValidatedHabit,
        start_date: NaiveDate,
    ) -> Result<Habit, StorageError> {
        let mut guard = self.lock()?;
        guard.next_habit_id += 1;
        let habit = habit.assign_id(HabitId::new(guard.next_habit_id), start_date);
        guard.habits.insert(habit.id(), habit.clone());
        Ok(habit)
    }

    async fn update_habit(
        &self,
        id: HabitId,
        habit: ValidatedHabit,
    ) -> Result<Habit, StorageError> {
        let mut guard = self.lock()?;
        let slot = guard.habits.get_mut(&id).ok_or(StorageError::NotFound)?;
        *slot = habit.replace(slot);
        Ok(slot.clone())
    }

    async fn delete_habit(&self, id: HabitId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.habits.remove(&id).ok_or(StorageError::NotFound)?;
        guard.progress.retain(|_, entry| entry.habit_id() != id);
        guard.streaks.remove(&id);
        Ok(())
    }

    async fn get_habit(&self, id: HabitId) -> Result<Option<Habit>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.habits.get(&id).cloned())
    }

    async fn list_habits(&self) -> Result<Vec<Habit>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.habits.values().cloned().collect())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn append_progress(&self, progress: NewProgress) -> Result<ProgressEntry, StorageError> {
        let mut guard = self.lock()?;
        if !guard.habits.contains_key(&progress.habit_id) {
            return Err(StorageError::NotFound);
        }
        guard.next_progress_id += 1;
        let entry = progress.assign_id(ProgressId::new(guard.next_progress_id));
        guard.progress.insert(entry.id(), entry.clone());
        Ok(entry)
    }

    async fn list_progress(&self) -> Result<Vec<ProgressEntry>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.progress.values().cloned().collect())
    }

    async fn progress_for_habit(
        &self,
        habit_id: HabitId,
    ) -> Result<Vec<ProgressEntry>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .progress
            .values()
            .filter(|entry| entry.habit_id() == habit_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StatsRepository for InMemoryRepository {
    async fn streaks(&self) -> Result<StreakMap, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .streaks
            .iter()
            .map(|(id, streak)| (*id, *streak))
            .collect())
    }

    async fn set_streak(&self, habit_id: HabitId, streak: u32) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.habits.contains_key(&habit_id) {
            return Err(StorageError::NotFound);
        }
        guard.streaks.insert(habit_id, streak);
        Ok(())
    }
}

/// Aggregates habit, progress and stats repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub habits: Arc<dyn HabitRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub stats: Arc<dyn StatsRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let habits: Arc<dyn HabitRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let stats: Arc<dyn StatsRepository> = Arc::new(repo);
        Self {
            habits,
            progress,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use habit_core::model::{ComparisonMode, Frequency, HabitDraft, ProgressDraft};
    use habit_core::time::fixed_now;

    fn validated(name: &str, target: f64) -> ValidatedHabit {
        HabitDraft {
            name: name.into(),
            mode: ComparisonMode::Above,
            frequency: Frequency::Daily,
            target,
            unit: None,
        }
        .validate()
        .unwrap()
    }

    fn progress(habit_id: HabitId, value: f64) -> NewProgress {
        ProgressDraft {
            habit_id,
            date: None,
            value,
        }
        .validate(fixed_now().date_naive())
        .unwrap()
    }

    #[tokio::test]
    async fn assigns_increasing_ids() {
        let repo = InMemoryRepository::new();
        let today = fixed_now().date_naive();
        let a = repo.insert_new_habit(validated("Read", 20.0), today).await.unwrap();
        let b = repo.insert_new_habit(validated("Run", 5.0), today).await.unwrap();
        assert!(b.id() > a.id());
        assert_eq!(a.start_date(), Some(today));

        let first = repo.append_progress(progress(a.id(), 3.0)).await.unwrap();
        let second = repo.append_progress(progress(a.id(), 4.0)).await.unwrap();
        assert!(second.id() > first.id());
    }

    #[tokio::test]
    async fn update_replaces_fields_and_keeps_identity() {
        let repo = InMemoryRepository::new();
        let today = fixed_now().date_naive();
        let habit = repo.insert_new_habit(validated("Read", 20.0), today).await.unwrap();

        let updated = repo
            .update_habit(habit.id(), validated("Read more", 30.0))
            .await
            .unwrap();
        assert_eq!(updated.id(), habit.id());
        assert_eq!(updated.name(), "Read more");
        assert_eq!(updated.target(), 30.0);
        assert_eq!(updated.start_date(), Some(today));

        let missing = repo
            .update_habit(HabitId::new(99), validated("Ghost", 1.0))
            .await;
        assert!(matches!(missing, Err(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn delete_cascades_to_progress_and_streaks() {
        let repo = InMemoryRepository::new();
        let today = fixed_now().date_naive();
        let keep = repo.insert_new_habit(validated("Keep", 2.0), today).await.unwrap();
        let gone = repo.insert_new_habit(validated("Gone", 2.0), today).await.unwrap();
        repo.append_progress(progress(keep.id(), 1.0)).await.unwrap();
        repo.append_progress(progress(gone.id(), 1.0)).await.unwrap();
        repo.set_streak(gone.id(), 3).await.unwrap();

        repo.delete_habit(gone.id()).await.unwrap();

        let remaining = repo.list_progress().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].habit_id(), keep.id());
        assert!(repo.progress_for_habit(gone.id()).await.unwrap().is_empty());
        assert_eq!(repo.streaks().await.unwrap().streak(gone.id()), None);
        assert!(matches!(
            repo.delete_habit(gone.id()).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn progress_for_unknown_habit_is_rejected() {
        let repo = InMemoryRepository::new();
        let result = repo.append_progress(progress(HabitId::new(7), 1.0)).await;
        assert!(matches!(result, Err(StorageError::NotFound)));
        assert!(matches!(
            repo.set_streak(HabitId::new(7), 2).await,
            Err(StorageError::NotFound)
        ));
    }
}
