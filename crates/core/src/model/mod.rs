mod habit;
mod ids;
mod progress;
mod stats;

pub use ids::{HabitId, ParseIdError, ProgressId};

pub use habit::{
    ComparisonMode, Frequency, Habit, HabitClass, HabitDraft, HabitError, HabitKind, HabitRecord,
    MAX_NAME_LEN, MAX_TARGET, MAX_UNIT_LEN, ValidatedHabit,
};
pub use progress::{
    MAX_PROGRESS_VALUE, NewProgress, Observation, ProgressDraft, ProgressEntry, ProgressError,
    parse_entry_date,
};
pub use stats::StreakMap;
