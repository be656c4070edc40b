//! Completion of a habit for its current period.

use serde::{Deserialize, Serialize};

use crate::model::{ComparisonMode, Habit};

/// Where a completion flag came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionSource {
    /// Supplied by storage alongside the habit record.
    Server,
    /// Derived locally from the aggregate.
    Computed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub completed: bool,
    pub source: CompletionSource,
}

/// Compare an aggregate against the habit's target.
///
/// `above` habits need at least the target, `below` habits at most. An `above`
/// habit with target 0 is therefore complete before anything is logged.
#[must_use]
pub fn meets_target(habit: &Habit, aggregate: f64) -> bool {
    match habit.mode() {
        ComparisonMode::Above => aggregate >= habit.target(),
        ComparisonMode::Below => aggregate <= habit.target(),
    }
}

/// Completion state, preferring the flag storage attached to the habit.
#[must_use]
pub fn resolve(habit: &Habit, aggregate: f64) -> Completion {
    match habit.server_completed() {
        Some(completed) => Completion {
            completed,
            source: CompletionSource::Server,
        },
        None => Completion {
            completed: meets_target(habit, aggregate),
            source: CompletionSource::Computed,
        },
    }
}

#[must_use]
pub fn is_completed(habit: &Habit, aggregate: f64) -> bool {
    resolve(habit, aggregate).completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Frequency, HabitId};

    fn habit(mode: ComparisonMode, target: f64) -> Habit {
        Habit::from_persisted(HabitId::new(1), "h", mode, Frequency::Daily, target, None, None)
    }

    #[test]
    fn below_zero_completes_only_while_nothing_is_logged() {
        let no_smoking = habit(ComparisonMode::Below, 0.0);
        assert!(is_completed(&no_smoking, 0.0));
        assert!(!is_completed(&no_smoking, 1.0));
    }

    #[test]
    fn binary_above_needs_a_one() {
        let h = habit(ComparisonMode::Above, 1.0);
        assert!(is_completed(&h, 1.0));
        assert!(!is_completed(&h, 0.0));
    }

    #[test]
    fn above_with_zero_target_is_vacuously_complete() {
        let h = habit(ComparisonMode::Above, 0.0);
        assert!(is_completed(&h, 0.0));
    }

    #[test]
    fn boundaries_are_inclusive() {
        assert!(is_completed(&habit(ComparisonMode::Above, 5.0), 5.0));
        assert!(is_completed(&habit(ComparisonMode::Below, 5.0), 5.0));
        assert!(!is_completed(&habit(ComparisonMode::Below, 5.0), 5.5));
    }

    #[test]
    fn server_flag_overrides_local_result() {
        let h = habit(ComparisonMode::Above, 10.0).with_server_completion(Some(true));
        let completion = resolve(&h, 2.0);
        assert!(completion.completed);
        assert_eq!(completion.source, CompletionSource::Server);

        let h = habit(ComparisonMode::Above, 10.0).with_server_completion(Some(false));
        assert!(!is_completed(&h, 20.0));
    }

    #[test]
    fn above_completion_is_monotonic_in_aggregate() {
        let h = habit(ComparisonMode::Above, 7.5);
        let mut seen_complete = false;
        for step in 0..40 {
            let completed = is_completed(&h, f64::from(step) * 0.5);
            assert!(completed || !seen_complete, "flipped back at step {step}");
            seen_complete |= completed;
        }
        assert!(seen_complete);
    }
}
