use std::fmt;

use chrono::{DateTime, Days, Utc};
use habit_core::model::{ComparisonMode, Frequency, HabitDraft, ProgressDraft};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    days: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDays { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDays { raw } => write!(f, "invalid --days value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("HABIT_DB_URL").unwrap_or_else(|_| "sqlite:habits.sqlite3".into());
        let mut days = std::env::var("HABIT_SEED_DAYS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(10);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--days" => {
                    let value = require_value(&mut args, "--days")?;
                    days = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidDays { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, days, now })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:habits.sqlite3)");
    eprintln!("  --days <n>                Days of progress history to append (default: 10)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  HABIT_DB_URL, HABIT_SEED_DAYS");
}

fn sample_habits() -> Vec<(HabitDraft, f64, u32)> {
    let draft = |name: &str,
                 mode: ComparisonMode,
                 frequency: Frequency,
                 target: f64,
                 unit: Option<&str>| HabitDraft {
        name: name.to_string(),
        mode,
        frequency,
        target,
        unit: unit.map(str::to_string),
    };
    // (habit, value logged per day, streak)
    vec![
        (
            draft("Walk", ComparisonMode::Above, Frequency::Daily, 10_000.0, Some("steps")),
            4_500.0,
            3,
        ),
        (
            draft("No smoking", ComparisonMode::Below, Frequency::Daily, 0.0, None),
            0.0,
            12,
        ),
        (
            draft("Meditate", ComparisonMode::Above, Frequency::Daily, 1.0, None),
            1.0,
            0,
        ),
        (
            draft("Read", ComparisonMode::Above, Frequency::Weekly, 100.0, Some("pages")),
            15.0,
            2,
        ),
    ]
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let today = args.now.unwrap_or_else(Utc::now).date_naive();

    let samples = sample_habits();
    let habit_count = samples.len();
    for (draft, daily_value, streak) in samples {
        let habit = storage
            .habits
            .insert_new_habit(draft.validate()?, today)
            .await?;

        for offset in (0..args.days).rev() {
            let Some(date) = today.checked_sub_days(Days::new(u64::from(offset))) else {
                continue;
            };
            let progress = ProgressDraft {
                habit_id: habit.id(),
                date: Some(date),
                value: daily_value,
            }
            .validate(today)?;
            storage.progress.append_progress(progress).await?;
        }

        storage.stats.set_streak(habit.id(), streak).await?;
    }

    println!(
        "Seeded {habit_count} habits with {} days of progress into {}",
        args.days, args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
