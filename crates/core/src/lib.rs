//! Progress aggregation, completion and windowing for habit tracking.
//!
//! Everything here is synchronous and pure: callers pass in the habit
//! snapshot, the progress log and "now", and get derived values back.

#![forbid(unsafe_code)]

pub mod aggregate;
pub mod completion;
pub mod error;
pub mod model;
pub mod projection;
pub mod time;
pub mod tracker;
pub mod window;

pub use error::Error;
pub use time::Clock;
pub use tracker::{HabitProgress, evaluate, evaluate_all};
pub use window::{Window, WindowPolicy};
