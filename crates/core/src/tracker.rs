//! Full pipeline from a habit snapshot to what a dashboard card shows.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::aggregate_in;
use crate::completion::{self, CompletionSource};
use crate::model::{Habit, HabitClass, HabitId, ProgressEntry, StreakMap};
use crate::projection::{Projection, project};
use crate::window::{Window, WindowPolicy};

/// Derived state of one habit for its current period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitProgress {
    pub habit_id: HabitId,
    pub window: Window,
    pub aggregate: f64,
    pub completed: bool,
    pub completion_source: CompletionSource,
    pub projection: Projection,
    pub class: HabitClass,
    /// Streak supplied by the stats collaborator, if it knows the habit.
    pub streak: Option<u32>,
    pub show_streak: bool,
}

/// Evaluate a single habit.
///
/// `entries` may contain progress for other habits; only `habit`'s entries
/// are considered.
#[must_use]
pub fn evaluate<'a, I>(
    habit: &Habit,
    entries: I,
    streaks: &StreakMap,
    now: DateTime<Utc>,
    policy: WindowPolicy,
) -> HabitProgress
where
    I: IntoIterator<Item = &'a ProgressEntry>,
{
    let window = policy.current(habit.frequency(), now);
    let aggregate = aggregate_in(habit, entries, &window);
    let completion = completion::resolve(habit, aggregate);

    HabitProgress {
        habit_id: habit.id(),
        window,
        aggregate,
        completed: completion.completed,
        completion_source: completion.source,
        projection: project(habit, aggregate),
        class: habit.class(),
        streak: streaks.streak(habit.id()),
        show_streak: streaks.shows_badge(habit.id()),
    }
}

/// Evaluate every habit of a snapshot, in habit order.
///
/// Progress is grouped by habit once. Entries whose habit is not in `habits`
/// are dropped.
#[must_use]
pub fn evaluate_all(
    habits: &[Habit],
    entries: &[ProgressEntry],
    streaks: &StreakMap,
    now: DateTime<Utc>,
    policy: WindowPolicy,
) -> Vec<HabitProgress> {
    let mut by_habit: HashMap<HabitId, Vec<&ProgressEntry>> =
        habits.iter().map(|habit| (habit.id(), Vec::new())).collect();

    let mut orphaned = 0usize;
    for entry in entries {
        match by_habit.get_mut(&entry.habit_id()) {
            Some(bucket) => bucket.push(entry),
            None => orphaned += 1,
        }
    }
    if orphaned > 0 {
        tracing::debug!(orphaned, "dropping progress entries without a habit");
    }

    habits
        .iter()
        .map(|habit| {
            let own = by_habit
                .get(&habit.id())
                .map(Vec::as_slice)
                .unwrap_or_default();
            evaluate(habit, own.iter().copied(), streaks, now, policy)
        })
        .collect()
}
