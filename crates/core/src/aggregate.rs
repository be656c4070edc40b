//! Reduction of a habit's progress log to the single value shown for the
//! current period.

use chrono::{DateTime, Utc};

use crate::model::{Habit, Observation, ProgressEntry};
use crate::window::{Window, WindowPolicy};

/// Aggregate `habit`'s progress over its rolling window at `now`.
///
/// Entries belonging to other habits are ignored, so the full progress list
/// can be passed in.
#[must_use]
pub fn aggregate<'a, I>(habit: &Habit, entries: I, now: DateTime<Utc>) -> f64
where
    I: IntoIterator<Item = &'a ProgressEntry>,
{
    let window = WindowPolicy::Rolling.current(habit.frequency(), now);
    aggregate_in(habit, entries, &window)
}

/// Aggregate `habit`'s progress over an explicit window.
///
/// Binary habits take the value of the latest entry, ordered by `(date, id)`.
/// Every other habit sums its entries. Malformed entries are skipped; with
/// nothing left the result is 0.
#[must_use]
pub fn aggregate_in<'a, I>(habit: &Habit, entries: I, window: &Window) -> f64
where
    I: IntoIterator<Item = &'a ProgressEntry>,
{
    let current = entries
        .into_iter()
        .filter(|entry| entry.habit_id() == habit.id())
        .filter_map(|entry| {
            let observation = entry.observation();
            if observation.is_none() {
                tracing::trace!(entry_id = %entry.id(), "skipping malformed progress entry");
            }
            observation
        })
        .filter(|observation| window.contains(observation.date));

    if habit.is_binary() {
        latest(current).map_or(0.0, |observation| observation.value)
    } else {
        current.fold(0.0, |total, observation| total + observation.value)
    }
}

fn latest(observations: impl Iterator<Item = Observation>) -> Option<Observation> {
    observations.max_by_key(|observation| (observation.date, observation.id))
}
