//! Streaks and period completion as the storage side computes them.
//!
//! Both work on calendar periods (Monday weeks, calendar months and years)
//! regardless of the dashboard's window policy.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;

use habit_core::aggregate::aggregate_in;
use habit_core::completion::meets_target;
use habit_core::model::{Habit, ProgressEntry, StreakMap};
use habit_core::window::Window;
use storage::repository::{HabitRepository, ProgressRepository, StatsRepository};

use crate::Clock;
use crate::error::StatsServiceError;

/// Consecutive successful periods ending at the one containing `today`.
///
/// The current period still counts when it succeeds but never breaks the run
/// while it is ongoing. Counting stops at the period containing the habit's
/// start date, or its earliest entry when the start date is unknown.
#[must_use]
pub fn calculate_streak(habit: &Habit, entries: &[ProgressEntry], today: NaiveDate) -> u32 {
    let frequency = habit.frequency();
    let mut by_period: HashMap<NaiveDate, Vec<&ProgressEntry>> = HashMap::new();
    let mut earliest: Option<NaiveDate> = None;
    for entry in entries.iter().filter(|entry| entry.habit_id() == habit.id()) {
        let Some(observation) = entry.observation() else {
            continue;
        };
        earliest = Some(earliest.map_or(observation.date, |d| d.min(observation.date)));
        by_period
            .entry(Window::calendar(frequency, observation.date).start())
            .or_default()
            .push(entry);
    }

    let present = Window::calendar(frequency, today);
    let first = habit
        .start_date()
        .or(earliest)
        .map_or(present.start(), |start| Window::calendar(frequency, start).start());

    let mut streak = 0;
    let mut period = present;
    while period.start() >= first {
        let in_period = by_period.get(&period.start()).into_iter().flatten().copied();
        if meets_target(habit, aggregate_in(habit, in_period, &period)) {
            streak += 1;
        } else if period != present {
            break;
        }
        let Some(previous) = period.start().pred_opt() else {
            break;
        };
        period = Window::calendar(frequency, previous);
    }
    streak
}

/// Whether `habit` meets its target in the calendar period containing `today`.
#[must_use]
pub fn current_period_completed(habit: &Habit, entries: &[ProgressEntry], today: NaiveDate) -> bool {
    let period = Window::calendar(habit.frequency(), today);
    meets_target(habit, aggregate_in(habit, entries, &period))
}

/// Attach a computed completion flag to every habit.
#[must_use]
pub fn attach_completion(
    habits: Vec<Habit>,
    entries: &[ProgressEntry],
    today: NaiveDate,
) -> Vec<Habit> {
    habits
        .into_iter()
        .map(|habit| {
            let completed = current_period_completed(&habit, entries, today);
            habit.with_server_completion(Some(completed))
        })
        .collect()
}

/// Recomputes streaks from the progress log and stores them.
#[derive(Clone)]
pub struct StatsService {
    clock: Clock,
    habits: Arc<dyn HabitRepository>,
    progress: Arc<dyn ProgressRepository>,
    stats: Arc<dyn StatsRepository>,
}

impl StatsService {
    #[must_use]
    pub fn new(
        clock: Clock,
        habits: Arc<dyn HabitRepository>,
        progress: Arc<dyn ProgressRepository>,
        stats: Arc<dyn StatsRepository>,
    ) -> Self {
        Self {
            clock,
            habits,
            progress,
            stats,
        }
    }

    /// Recompute and store the streak of one habit.
    ///
    /// # Errors
    ///
    /// Returns `StatsServiceError::Storage` if progress cannot be read or the
    /// streak cannot be written.
    pub async fn recompute(&self, habit: &Habit) -> Result<u32, StatsServiceError> {
        let entries = self.progress.progress_for_habit(habit.id()).await?;
        let streak = calculate_streak(habit, &entries, self.clock.today());
        self.stats.set_streak(habit.id(), streak).await?;
        tracing::debug!(habit_id = %habit.id(), streak, "stored streak");
        Ok(streak)
    }

    /// Recompute and store the streak of every habit.
    ///
    /// # Errors
    ///
    /// Returns `StatsServiceError::Storage` on the first repository failure.
    pub async fn recompute_all(&self) -> Result<StreakMap, StatsServiceError> {
        let habits = self.habits.list_habits().await?;
        let entries = self.progress.list_progress().await?;
        let today = self.clock.today();

        let mut streaks = StreakMap::new();
        for habit in &habits {
            let streak = calculate_streak(habit, &entries, today);
            self.stats.set_streak(habit.id(), streak).await?;
            streaks.insert(habit.id(), streak);
        }
        tracing::info!(habits = habits.len(), "recomputed streaks");
        Ok(streaks)
    }
}
