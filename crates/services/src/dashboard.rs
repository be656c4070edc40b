use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use habit_core::model::{Habit, HabitId, ProgressEntry, StreakMap};
use habit_core::{HabitProgress, WindowPolicy, tracker};
use storage::repository::{HabitRepository, ProgressRepository, StatsRepository};

use crate::Clock;
use crate::error::RefreshError;
use crate::streaks::attach_completion;

/// Last successfully fetched state of each source.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub habits: Vec<Habit>,
    pub progress: Vec<ProgressEntry>,
    pub streaks: StreakMap,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Outcome of a full refresh; each source reports the number of records loaded.
#[derive(Debug)]
pub struct RefreshReport {
    pub habits: Result<usize, RefreshError>,
    pub progress: Result<usize, RefreshError>,
    pub stats: Result<usize, RefreshError>,
}

impl RefreshReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.habits.is_ok() && self.progress.is_ok() && self.stats.is_ok()
    }

    pub fn errors(&self) -> impl Iterator<Item = &RefreshError> {
        [&self.habits, &self.progress, &self.stats]
            .into_iter()
            .filter_map(|outcome| outcome.as_ref().err())
    }
}

/// Keeps a cached habit/progress/stats snapshot and turns it into dashboard
/// cards.
///
/// Sources refresh independently; a failed refresh leaves that source's
/// previous data in place.
pub struct DashboardService {
    clock: Clock,
    policy: WindowPolicy,
    server_completion: bool,
    habits: Arc<dyn HabitRepository>,
    progress: Arc<dyn ProgressRepository>,
    stats: Arc<dyn StatsRepository>,
    snapshot: RwLock<Snapshot>,
}

impl DashboardService {
    #[must_use]
    pub fn new(
        clock: Clock,
        policy: WindowPolicy,
        habits: Arc<dyn HabitRepository>,
        progress: Arc<dyn ProgressRepository>,
        stats: Arc<dyn StatsRepository>,
    ) -> Self {
        Self {
            clock,
            policy,
            server_completion: false,
            habits,
            progress,
            stats,
            snapshot: RwLock::new(Snapshot::default()),
        }
    }

    /// Have the habit listing carry a completion flag for the current
    /// calendar period, which then overrides the locally computed one.
    #[must_use]
    pub fn with_server_completion(mut self, enabled: bool) -> Self {
        self.server_completion = enabled;
        self
    }

    #[must_use]
    pub fn policy(&self) -> WindowPolicy {
        self.policy
    }

    /// Reload the habit list.
    ///
    /// # Errors
    ///
    /// Returns `RefreshError::Habits` if the repository fails; the cached list
    /// is kept.
    pub async fn refresh_habits(&self) -> Result<usize, RefreshError> {
        let mut habits = self.habits.list_habits().await.map_err(RefreshError::Habits)?;
        if self.server_completion {
            let progress = self
                .progress
                .list_progress()
                .await
                .map_err(RefreshError::Habits)?;
            habits = attach_completion(habits, &progress, self.clock.today());
        }
        let count = habits.len();
        let mut snapshot = self.snapshot.write().await;
        snapshot.habits = habits;
        snapshot.refreshed_at = Some(self.clock.now());
        Ok(count)
    }

    /// Reload the progress log.
    ///
    /// # Errors
    ///
    /// Returns `RefreshError::Progress` if the repository fails; the cached
    /// log is kept.
    pub async fn refresh_progress(&self) -> Result<usize, RefreshError> {
        let progress = self
            .progress
            .list_progress()
            .await
            .map_err(RefreshError::Progress)?;
        let count = progress.len();
        let mut snapshot = self.snapshot.write().await;
        snapshot.progress = progress;
        snapshot.refreshed_at = Some(self.clock.now());
        Ok(count)
    }

    /// Reload streak counts.
    ///
    /// # Errors
    ///
    /// Returns `RefreshError::Stats` if the repository fails; the cached
    /// streaks are kept.
    pub async fn refresh_stats(&self) -> Result<usize, RefreshError> {
        let streaks = self.stats.streaks().await.map_err(RefreshError::Stats)?;
        let count = streaks.len();
        let mut snapshot = self.snapshot.write().await;
        snapshot.streaks = streaks;
        snapshot.refreshed_at = Some(self.clock.now());
        Ok(count)
    }

    /// Refresh all three sources concurrently.
    pub async fn refresh_all(&self) -> RefreshReport {
        let (habits, progress, stats) = tokio::join!(
            self.refresh_habits(),
            self.refresh_progress(),
            self.refresh_stats()
        );
        let report = RefreshReport {
            habits,
            progress,
            stats,
        };
        for error in report.errors() {
            let cause = std::error::Error::source(error).map(ToString::to_string);
            tracing::warn!(%error, ?cause, "dashboard refresh failed");
        }
        report
    }

    /// A consistent copy of the cached state.
    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.read().await.clone()
    }

    /// Evaluate every cached habit at the clock's current time.
    pub async fn cards(&self) -> Vec<HabitProgress> {
        let snapshot = self.snapshot().await;
        tracker::evaluate_all(
            &snapshot.habits,
            &snapshot.progress,
            &snapshot.streaks,
            self.clock.now(),
            self.policy,
        )
    }

    /// Evaluate a single cached habit.
    pub async fn card(&self, habit_id: HabitId) -> Option<HabitProgress> {
        let snapshot = self.snapshot.read().await;
        let habit = snapshot.habits.iter().find(|habit| habit.id() == habit_id)?;
        Some(tracker::evaluate(
            habit,
            &snapshot.progress,
            &snapshot.streaks,
            self.clock.now(),
            self.policy,
        ))
    }
}
