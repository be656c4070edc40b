//! Selection of the "current period" a habit's progress is aggregated over.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Frequency;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown window policy: {0} (expected `rolling` or `calendar`)")]
pub struct UnknownWindowPolicy(pub String);

/// How the current period is derived from "now".
///
/// `Rolling` looks back a fixed number of days (7 / 30 / 365) and is the
/// default. `CalendarAligned` snaps to the Monday-based week, the calendar
/// month or the calendar year containing today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowPolicy {
    #[default]
    Rolling,
    #[serde(rename = "calendar")]
    CalendarAligned,
}

impl WindowPolicy {
    /// The window that is "current" for `frequency` at `now`.
    #[must_use]
    pub fn current(self, frequency: Frequency, now: DateTime<Utc>) -> Window {
        match self {
            Self::Rolling => Window {
                start: window_start(frequency, now),
                end: None,
            },
            Self::CalendarAligned => Window::calendar(frequency, now.date_naive()),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rolling => "rolling",
            Self::CalendarAligned => "calendar",
        }
    }
}

impl fmt::Display for WindowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowPolicy {
    type Err = UnknownWindowPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rolling" => Ok(Self::Rolling),
            "calendar" | "calendar-aligned" | "calendar_aligned" => Ok(Self::CalendarAligned),
            _ => Err(UnknownWindowPolicy(s.to_string())),
        }
    }
}

/// Inclusive start date and optional exclusive end date of a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    start: NaiveDate,
    end: Option<NaiveDate>,
}

impl Window {
    /// The calendar period of `frequency` that contains `date`.
    #[must_use]
    pub fn calendar(frequency: Frequency, date: NaiveDate) -> Self {
        let (start, end) = calendar_period(frequency, date);
        Self {
            start,
            end: Some(end),
        }
    }

    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && self.end.is_none_or(|end| date < end)
    }
}

/// Cutoff of the rolling window: entries dated on or after it are current.
///
/// Weekly, monthly and yearly windows are fixed 7, 30 and 365 day lookbacks,
/// not calendar-aligned periods.
#[must_use]
pub fn window_start(frequency: Frequency, now: DateTime<Utc>) -> NaiveDate {
    let today = now.date_naive();
    let lookback = match frequency {
        Frequency::Daily => return today,
        Frequency::Weekly => 7,
        Frequency::Monthly => 30,
        Frequency::Yearly => 365,
    };
    today
        .checked_sub_days(Days::new(lookback))
        .unwrap_or(NaiveDate::MIN)
}

/// Calendar period `[start, end)` containing `date`.
#[must_use]
pub fn calendar_period(frequency: Frequency, date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = match frequency {
        Frequency::Daily => date,
        Frequency::Weekly => date
            .checked_sub_days(Days::new(u64::from(
                date.weekday().num_days_from_monday(),
            )))
            .unwrap_or(NaiveDate::MIN),
        Frequency::Monthly => date.with_day(1).unwrap_or(date),
        Frequency::Yearly => date.with_ordinal(1).unwrap_or(date),
    };
    let end = match frequency {
        Frequency::Daily => start.checked_add_days(Days::new(1)),
        Frequency::Weekly => start.checked_add_days(Days::new(7)),
        Frequency::Monthly => start.checked_add_months(Months::new(1)),
        Frequency::Yearly => start.checked_add_months(Months::new(12)),
    }
    .unwrap_or(NaiveDate::MAX);
    (start, end)
}
