use habit_core::model::{
    Frequency, Habit, HabitId, HabitKind, ProgressEntry, ProgressId, parse_entry_date,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Classify a failed write: a dangling `habit_id` means the habit is gone.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        _ => StorageError::Connection(e.to_string()),
    }
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn habit_id_from_i64(v: i64) -> Result<HabitId, StorageError> {
    Ok(HabitId::new(i64_to_u64("habit_id", v)?))
}

pub(crate) fn progress_id_from_i64(v: i64) -> Result<ProgressId, StorageError> {
    Ok(ProgressId::new(i64_to_u64("progress_id", v)?))
}

pub(crate) fn streak_from_i64(v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid streak: {v}")))
}

/// Rows written before the above/below split carry `binary` or
/// `quantitative`; both load through `HabitKind`.
///
/// An unknown `type` or `frequency` is a `Serialization` error; listings skip
/// such rows instead of failing.
pub(crate) fn map_habit_row(row: &SqliteRow) -> Result<Habit, StorageError> {
    let kind: HabitKind = row
        .try_get::<String, _>("type")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let frequency: Frequency = row
        .try_get::<String, _>("frequency")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let target = kind.resolve_target(lenient_real(row, "target")?);
    let start_date = lenient_text(row, "start_date")?
        .as_deref()
        .and_then(parse_entry_date);

    Ok(Habit::from_persisted(
        habit_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        kind.mode(),
        frequency,
        target,
        lenient_text(row, "unit")?,
        start_date,
    ))
}

/// Unparseable dates and values are kept as absent, not rejected.
pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<ProgressEntry, StorageError> {
    let raw_date = lenient_text(row, "date")?;
    let date = raw_date.as_deref().and_then(parse_entry_date);
    if date.is_none()
        && let Some(raw) = raw_date.as_deref()
    {
        tracing::debug!(raw, "unparseable progress date");
    }

    Ok(ProgressEntry::from_persisted(
        progress_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        habit_id_from_i64(row.try_get::<i64, _>("habit_id").map_err(ser)?)?,
        date,
        lenient_real(row, "value")?,
    ))
}

/// Read a numeric column whatever its stored type.
///
/// REAL and INTEGER values are taken as-is and TEXT is parsed; anything else,
/// or text that is not a number, reads as `None`. Only a missing column is an
/// error.
#[allow(clippy::cast_precision_loss)]
fn lenient_real(row: &SqliteRow, column: &'static str) -> Result<Option<f64>, StorageError> {
    let value = match row.try_get::<Option<f64>, _>(column) {
        Ok(value) => value,
        Err(sqlx::Error::ColumnDecode { .. }) => match row.try_get::<Option<i64>, _>(column) {
            Ok(value) => value.map(|v| v as f64),
            Err(sqlx::Error::ColumnDecode { .. }) => {
                let raw = lenient_text(row, column)?;
                let parsed = raw.as_deref().and_then(|raw| raw.trim().parse::<f64>().ok());
                if parsed.is_none() {
                    tracing::debug!(column, raw = ?raw, "non-numeric value read as absent");
                }
                parsed
            }
            Err(e) => return Err(ser(e)),
        },
        Err(e) => return Err(ser(e)),
    };
    Ok(value.filter(|v| v.is_finite()))
}

/// Read a text column; numbers are rendered and blobs read as `None`.
fn lenient_text(row: &SqliteRow, column: &'static str) -> Result<Option<String>, StorageError> {
    match row.try_get::<Option<String>, _>(column) {
        Ok(value) => Ok(value),
        Err(sqlx::Error::ColumnDecode { .. }) => {
            if let Ok(value) = row.try_get::<Option<i64>, _>(column) {
                return Ok(value.map(|v| v.to_string()));
            }
            if let Ok(value) = row.try_get::<Option<f64>, _>(column) {
                return Ok(value.map(|v| v.to_string()));
            }
            tracing::debug!(column, "undecodable text column read as absent");
            Ok(None)
        }
        Err(e) => Err(ser(e)),
    }
}
