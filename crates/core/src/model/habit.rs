use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::HabitId;

/// Longest accepted habit name, in characters.
pub const MAX_NAME_LEN: usize = 120;
/// Longest accepted unit label, in characters.
pub const MAX_UNIT_LEN: usize = 20;
/// Upper bound for targets entered through a draft.
pub const MAX_TARGET: f64 = 1_000_000.0;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum HabitError {
    #[error("habit name cannot be empty")]
    EmptyName,

    #[error("habit name must not exceed {MAX_NAME_LEN} characters (got {len})")]
    NameTooLong { len: usize },

    #[error("unit must not exceed {MAX_UNIT_LEN} characters (got {len})")]
    UnitTooLong { len: usize },

    #[error("target must be a finite number")]
    NonFiniteTarget,

    #[error("target cannot be negative")]
    NegativeTarget,

    #[error("target is too large (max {MAX_TARGET})")]
    TargetTooLarge,

    #[error("above-type habits must have a target higher than 0")]
    ZeroAboveTarget,

    #[error("unknown frequency: {0}")]
    UnknownFrequency(String),

    #[error("unknown habit type: {0}")]
    UnknownKind(String),
}

//
// ─── FREQUENCY ─────────────────────────────────────────────────────────────────
//

/// Cadence of a habit; selects the length of its aggregation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = HabitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(HabitError::UnknownFrequency(s.to_string())),
        }
    }
}

//
// ─── COMPARISON MODE ───────────────────────────────────────────────────────────
//

/// How the aggregate is compared against the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonMode {
    /// Reach or maintain at least the target.
    Above,
    /// Stay at or under the target.
    Below,
}

impl ComparisonMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
        }
    }
}

impl fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Habit type as it appears on the wire.
///
/// Older records use `binary`/`quantitative`, newer ones `above`/`below`.
/// Both families collapse into a [`ComparisonMode`] when a [`Habit`] is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitKind {
    Above,
    Below,
    Binary,
    Quantitative,
}

impl HabitKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
            Self::Binary => "binary",
            Self::Quantitative => "quantitative",
        }
    }

    #[must_use]
    pub fn mode(self) -> ComparisonMode {
        match self {
            Self::Below => ComparisonMode::Below,
            Self::Above | Self::Binary | Self::Quantitative => ComparisonMode::Above,
        }
    }

    /// Target to use for a record of this kind.
    ///
    /// `binary` records are done/not-done habits and always resolve to
    /// `above` with target 1, whatever target they carry. Other kinds default
    /// to 0 when the target is missing.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn resolve_target(self, target: Option<f64>) -> f64 {
        match (self, target) {
            (Self::Binary, Some(raw)) if raw != 1.0 => {
                tracing::debug!(target = raw, "binary habit target forced to 1");
                1.0
            }
            (Self::Binary, _) => 1.0,
            (_, Some(raw)) => raw,
            (_, None) => 0.0,
        }
    }
}

impl From<ComparisonMode> for HabitKind {
    fn from(mode: ComparisonMode) -> Self {
        match mode {
            ComparisonMode::Above => Self::Above,
            ComparisonMode::Below => Self::Below,
        }
    }
}

impl fmt::Display for HabitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HabitKind {
    type Err = HabitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "above" => Ok(Self::Above),
            "below" => Ok(Self::Below),
            "binary" => Ok(Self::Binary),
            "quantitative" => Ok(Self::Quantitative),
            _ => Err(HabitError::UnknownKind(s.to_string())),
        }
    }
}

/// Presentational classification derived from the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitClass {
    /// Target of 0 or 1: done / not done.
    Binary,
    Quantitative,
}

//
// ─── HABIT ─────────────────────────────────────────────────────────────────────
//

/// A trackable goal as fetched from storage.
///
/// Records coming back from a collaborator are taken as-is; only drafts are
/// validated. The engine stays total over whatever a `Habit` holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "HabitRecord", into = "HabitRecord")]
pub struct Habit {
    id: HabitId,
    name: String,
    mode: ComparisonMode,
    frequency: Frequency,
    target: f64,
    unit: Option<String>,
    start_date: Option<NaiveDate>,
    server_completed: Option<bool>,
}

impl Habit {
    /// Rehydrate a habit from persisted fields without validation.
    ///
    /// Negative or non-finite targets collapse to 0.
    #[must_use]
    pub fn from_persisted(
        id: HabitId,
        name: impl Into<String>,
        mode: ComparisonMode,
        frequency: Frequency,
        target: f64,
        unit: Option<String>,
        start_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            mode,
            frequency,
            target: sanitize_target(target),
            unit,
            start_date,
            server_completed: None,
        }
    }

    /// Attach the completion flag computed by the storage collaborator.
    #[must_use]
    pub fn with_server_completion(mut self, completed: Option<bool>) -> Self {
        self.server_completed = completed;
        self
    }

    #[must_use]
    pub fn id(&self) -> HabitId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn mode(&self) -> ComparisonMode {
        self.mode
    }

    #[must_use]
    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    #[must_use]
    pub fn target(&self) -> f64 {
        self.target
    }

    #[must_use]
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    #[must_use]
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    /// Completion flag supplied by storage, if any.
    #[must_use]
    pub fn server_completed(&self) -> Option<bool> {
        self.server_completed
    }

    /// A target of exactly 0 or 1 marks a done/not-done habit in either mode.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn class(&self) -> HabitClass {
        if self.target == 0.0 || self.target == 1.0 {
            HabitClass::Binary
        } else {
            HabitClass::Quantitative
        }
    }

    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.class() == HabitClass::Binary
    }
}

fn sanitize_target(target: f64) -> f64 {
    if target.is_finite() && target >= 0.0 {
        // folds -0.0 into 0.0
        target.abs()
    } else {
        tracing::debug!(target, "discarding invalid habit target");
        0.0
    }
}

//
// ─── WIRE RECORD ───────────────────────────────────────────────────────────────
//

/// Serialized shape of a habit exchanged with the storage collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitRecord {
    pub id: HabitId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: HabitKind,
    pub frequency: Frequency,
    #[serde(default)]
    pub target: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

impl From<HabitRecord> for Habit {
    fn from(record: HabitRecord) -> Self {
        let target = record.kind.resolve_target(record.target);
        Habit::from_persisted(
            record.id,
            record.name,
            record.kind.mode(),
            record.frequency,
            target,
            record.unit,
            record.start_date,
        )
        .with_server_completion(record.is_completed)
    }
}

impl From<Habit> for HabitRecord {
    fn from(habit: Habit) -> Self {
        Self {
            id: habit.id,
            name: habit.name,
            kind: habit.mode.into(),
            frequency: habit.frequency,
            target: Some(habit.target),
            unit: habit.unit,
            is_completed: habit.server_completed,
            start_date: habit.start_date,
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// User-entered habit fields, validated before they reach storage.
#[derive(Debug, Clone, PartialEq)]
pub struct HabitDraft {
    pub name: String,
    pub mode: ComparisonMode,
    pub frequency: Frequency,
    pub target: f64,
    pub unit: Option<String>,
}

impl HabitDraft {
    /// Validate and normalize the draft.
    ///
    /// # Errors
    ///
    /// Returns `HabitError` when the name, unit or target is out of bounds, or
    /// when an `above` habit has a zero target.
    pub fn validate(self) -> Result<ValidatedHabit, HabitError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(HabitError::EmptyName);
        }
        let len = name.chars().count();
        if len > MAX_NAME_LEN {
            return Err(HabitError::NameTooLong { len });
        }

        let unit = self
            .unit
            .map(|val| val.trim().to_string())
            .filter(|val| !val.is_empty());
        if let Some(len) = unit.as_ref().map(|u| u.chars().count())
            && len > MAX_UNIT_LEN
        {
            return Err(HabitError::UnitTooLong { len });
        }

        if !self.target.is_finite() {
            return Err(HabitError::NonFiniteTarget);
        }
        if self.target < 0.0 {
            return Err(HabitError::NegativeTarget);
        }
        if self.target > MAX_TARGET {
            return Err(HabitError::TargetTooLarge);
        }
        if self.mode == ComparisonMode::Above && self.target == 0.0 {
            return Err(HabitError::ZeroAboveTarget);
        }

        Ok(ValidatedHabit {
            name,
            mode: self.mode,
            frequency: self.frequency,
            target: self.target,
            unit,
        })
    }
}

/// A draft that passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedHabit {
    pub name: String,
    pub mode: ComparisonMode,
    pub frequency: Frequency,
    pub target: f64,
    pub unit: Option<String>,
}

impl ValidatedHabit {
    #[must_use]
    pub fn assign_id(self, id: HabitId, start_date: NaiveDate) -> Habit {
        Habit::from_persisted(
            id,
            self.name,
            self.mode,
            self.frequency,
            self.target,
            self.unit,
            Some(start_date),
        )
    }

    /// Replace every editable field of `existing`, keeping its identity.
    #[must_use]
    pub fn replace(self, existing: &Habit) -> Habit {
        Habit::from_persisted(
            existing.id(),
            self.name,
            self.mode,
            self.frequency,
            self.target,
            self.unit,
            existing.start_date(),
        )
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(mode: ComparisonMode, target: f64) -> HabitDraft {
        HabitDraft {
            name: "Walk".into(),
            mode,
            frequency: Frequency::Daily,
            target,
            unit: Some("steps".into()),
        }
    }

    #[test]
    fn binary_class_is_derived_from_target() {
        let make = |target| {
            Habit::from_persisted(
                HabitId::new(1),
                "h",
                ComparisonMode::Below,
                Frequency::Daily,
                target,
                None,
                None,
            )
        };
        assert_eq!(make(0.0).class(), HabitClass::Binary);
        assert_eq!(make(1.0).class(), HabitClass::Binary);
        assert_eq!(make(2.0).class(), HabitClass::Quantitative);
    }

    #[test]
    fn legacy_binary_record_maps_to_above_with_unit_target() {
        let json = r#"{"id": 3, "name": "Floss", "type": "binary", "frequency": "daily"}"#;
        let habit: Habit = serde_json::from_str(json).unwrap();
        assert_eq!(habit.mode(), ComparisonMode::Above);
        assert_eq!(habit.target(), 1.0);
        assert!(habit.is_binary());
        assert_eq!(habit.server_completed(), None);
    }

    #[test]
    fn explicit_binary_type_overrides_a_stored_target() {
        let json = r#"{"id": 1, "name": "Stretch", "type": "binary", "frequency": "daily",
                       "target": 5}"#;
        let habit: Habit = serde_json::from_str(json).unwrap();
        assert_eq!(habit.mode(), ComparisonMode::Above);
        assert_eq!(habit.target(), 1.0);
        assert!(habit.is_binary());

        assert_eq!(HabitKind::Binary.resolve_target(Some(0.0)), 1.0);
        assert_eq!(HabitKind::Quantitative.resolve_target(Some(5.0)), 5.0);
        assert_eq!(HabitKind::Below.resolve_target(None), 0.0);
    }

    #[test]
    fn record_carries_server_completion_and_unit() {
        let json = r#"{"id": 1, "name": "Walk", "type": "above", "frequency": "weekly",
                       "target": 10000, "unit": "steps", "is_completed": true}"#;
        let habit: Habit = serde_json::from_str(json).unwrap();
        assert_eq!(habit.frequency(), Frequency::Weekly);
        assert_eq!(habit.unit(), Some("steps"));
        assert_eq!(habit.server_completed(), Some(true));
    }

    #[test]
    fn habit_serializes_with_type_field() {
        let habit = Habit::from_persisted(
            HabitId::new(2),
            "No smoking",
            ComparisonMode::Below,
            Frequency::Daily,
            0.0,
            None,
            None,
        );
        let value = serde_json::to_value(&habit).unwrap();
        assert_eq!(value["type"], "below");
        assert_eq!(value["frequency"], "daily");
        assert_eq!(value["target"], 0.0);
    }

    #[test]
    fn invalid_persisted_target_collapses_to_zero() {
        let habit = Habit::from_persisted(
            HabitId::new(1),
            "h",
            ComparisonMode::Above,
            Frequency::Daily,
            f64::NAN,
            None,
            None,
        );
        assert_eq!(habit.target(), 0.0);
    }

    #[test]
    fn draft_validation_normalizes_name_and_unit() {
        let validated = HabitDraft {
            name: "  Read  ".into(),
            unit: Some("   ".into()),
            ..draft(ComparisonMode::Above, 20.0)
        }
        .validate()
        .unwrap();
        assert_eq!(validated.name, "Read");
        assert_eq!(validated.unit, None);
    }

    #[test]
    fn draft_validation_rejects_bad_fields() {
        let empty = HabitDraft {
            name: "   ".into(),
            ..draft(ComparisonMode::Above, 1.0)
        };
        assert_eq!(empty.validate().unwrap_err(), HabitError::EmptyName);

        let long_name = HabitDraft {
            name: "x".repeat(121),
            ..draft(ComparisonMode::Above, 1.0)
        };
        assert_eq!(
            long_name.validate().unwrap_err(),
            HabitError::NameTooLong { len: 121 }
        );

        let long_unit = HabitDraft {
            unit: Some("u".repeat(21)),
            ..draft(ComparisonMode::Above, 1.0)
        };
        assert_eq!(
            long_unit.validate().unwrap_err(),
            HabitError::UnitTooLong { len: 21 }
        );

        assert_eq!(
            draft(ComparisonMode::Below, -1.0).validate().unwrap_err(),
            HabitError::NegativeTarget
        );
        assert_eq!(
            draft(ComparisonMode::Below, 1_000_001.0)
                .validate()
                .unwrap_err(),
            HabitError::TargetTooLarge
        );
        assert_eq!(
            draft(ComparisonMode::Above, f64::INFINITY)
                .validate()
                .unwrap_err(),
            HabitError::NonFiniteTarget
        );
    }

    #[test]
    fn zero_target_is_only_rejected_for_above() {
        assert_eq!(
            draft(ComparisonMode::Above, 0.0).validate().unwrap_err(),
            HabitError::ZeroAboveTarget
        );
        assert!(draft(ComparisonMode::Below, 0.0).validate().is_ok());
    }

    #[test]
    fn replace_keeps_identity_and_drops_server_flag() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let existing = draft(ComparisonMode::Above, 10.0)
            .validate()
            .unwrap()
            .assign_id(HabitId::new(8), start)
            .with_server_completion(Some(true));

        let edited = draft(ComparisonMode::Below, 3.0)
            .validate()
            .unwrap()
            .replace(&existing);
        assert_eq!(edited.id(), HabitId::new(8));
        assert_eq!(edited.start_date(), Some(start));
        assert_eq!(edited.mode(), ComparisonMode::Below);
        assert_eq!(edited.server_completed(), None);
    }

    #[test]
    fn parses_kinds_and_frequencies() {
        assert_eq!("Weekly".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert_eq!("binary".parse::<HabitKind>().unwrap(), HabitKind::Binary);
        assert!(matches!(
            "hourly".parse::<Frequency>(),
            Err(HabitError::UnknownFrequency(_))
        ));
    }
}
