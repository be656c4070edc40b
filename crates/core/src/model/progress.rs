use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::model::ids::{HabitId, ProgressId};

/// Upper bound for a single logged value.
pub const MAX_PROGRESS_VALUE: f64 = 1_000_000.0;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("progress value must be a finite number")]
    NonFiniteValue,

    #[error("progress value cannot be negative")]
    NegativeValue,

    #[error("progress value is too large (max {MAX_PROGRESS_VALUE})")]
    ValueTooLarge,

    #[error("progress entry date {date} cannot be in the future (today is {today})")]
    FutureDate { date: NaiveDate, today: NaiveDate },
}

/// One dated, numeric event logged against a habit.
///
/// `date` and `value` are optional because records from the storage
/// collaborator may be malformed; such entries are kept but never aggregated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    id: ProgressId,
    habit_id: HabitId,
    #[serde(default, deserialize_with = "lenient_date")]
    date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_value")]
    value: Option<f64>,
}

/// The usable part of a well-formed progress entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub id: ProgressId,
    pub date: NaiveDate,
    pub value: f64,
}

impl ProgressEntry {
    #[must_use]
    pub fn new(id: ProgressId, habit_id: HabitId, date: NaiveDate, value: f64) -> Self {
        Self::from_persisted(id, habit_id, Some(date), Some(value))
    }

    /// Rehydrate an entry whose date or value may be missing.
    #[must_use]
    pub fn from_persisted(
        id: ProgressId,
        habit_id: HabitId,
        date: Option<NaiveDate>,
        value: Option<f64>,
    ) -> Self {
        Self {
            id,
            habit_id,
            date,
            value,
        }
    }

    #[must_use]
    pub fn id(&self) -> ProgressId {
        self.id
    }

    #[must_use]
    pub fn habit_id(&self) -> HabitId {
        self.habit_id
    }

    #[must_use]
    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    #[must_use]
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Returns `None` when the date is missing or the value is missing or not finite.
    #[must_use]
    pub fn observation(&self) -> Option<Observation> {
        let date = self.date?;
        let value = self.value.filter(|v| v.is_finite())?;
        Some(Observation {
            id: self.id,
            date,
            value,
        })
    }
}

/// Parse a progress date, normalizing any time of day away.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps (truncated to their UTC date) and
/// naive `YYYY-MM-DDTHH:MM:SS` timestamps.
#[must_use]
pub fn parse_entry_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|ts| ts.date())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Number(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Text(raw)) => parse_entry_date(&raw),
        _ => None,
    })
}

fn lenient_value<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Number(v)) => Some(v),
        // form inputs sometimes arrive as numeric strings
        Some(Loose::Text(raw)) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// A progress event about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressDraft {
    pub habit_id: HabitId,
    /// Defaults to `today` when absent.
    pub date: Option<NaiveDate>,
    pub value: f64,
}

impl ProgressDraft {
    /// Validate the draft against the current UTC date.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the value is out of range or the date lies
    /// after `today`.
    pub fn validate(self, today: NaiveDate) -> Result<NewProgress, ProgressError> {
        if !self.value.is_finite() {
            return Err(ProgressError::NonFiniteValue);
        }
        if self.value < 0.0 {
            return Err(ProgressError::NegativeValue);
        }
        if self.value > MAX_PROGRESS_VALUE {
            return Err(ProgressError::ValueTooLarge);
        }
        let date = self.date.unwrap_or(today);
        if date > today {
            return Err(ProgressError::FutureDate { date, today });
        }
        Ok(NewProgress {
            habit_id: self.habit_id,
            date,
            value: self.value,
        })
    }
}

/// Validated progress without an id yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewProgress {
    pub habit_id: HabitId,
    pub date: NaiveDate,
    pub value: f64,
}

impl NewProgress {
    #[must_use]
    pub fn assign_id(self, id: ProgressId) -> ProgressEntry {
        ProgressEntry::new(id, self.habit_id, self.date, self.value)
    }
}
