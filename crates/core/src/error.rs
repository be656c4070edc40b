use thiserror::Error;

use crate::model::{HabitError, ParseIdError, ProgressError};
use crate::window::UnknownWindowPolicy;

/// Any validation or parsing failure raised by the core.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Habit(#[from] HabitError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    ParseId(#[from] ParseIdError),
    #[error(transparent)]
    WindowPolicy(#[from] UnknownWindowPolicy),
}
