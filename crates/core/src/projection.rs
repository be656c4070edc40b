//! Display values for a habit's progress bar.

use serde::{Deserialize, Serialize};

use crate::model::{ComparisonMode, Habit};

/// What a progress indicator shows for one habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// `"{aggregate}/{target}"`, whole numbers without a fractional part.
    pub ratio_text: String,
    /// Fill level in `[0, 100]`.
    pub percentage: f64,
    /// A `below` habit went over its limit.
    pub exceeded: bool,
}

/// Project an aggregate onto the habit's target.
///
/// For `above` habits the bar fills towards the target. For `below` habits it
/// drains as the limit is approached, and is empty once it is passed.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn project(habit: &Habit, aggregate: f64) -> Projection {
    let target = habit.target();
    let percentage = match habit.mode() {
        ComparisonMode::Above if target == 0.0 => full_if(aggregate >= 0.0),
        ComparisonMode::Above => filled(aggregate, target),
        ComparisonMode::Below if target == 0.0 => full_if(aggregate == 0.0),
        ComparisonMode::Below => 100.0 - filled(aggregate, target),
    };

    Projection {
        ratio_text: format!("{aggregate}/{target}"),
        percentage,
        exceeded: habit.mode() == ComparisonMode::Below && aggregate > target,
    }
}

fn filled(aggregate: f64, target: f64) -> f64 {
    // multiply first so 7000/10000 lands on exactly 70
    let percent = aggregate * 100.0 / target;
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

fn full_if(condition: bool) -> f64 {
    if condition { 100.0 } else { 0.0 }
}
