use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use habit_core::model::{Frequency, Habit, HabitDraft, HabitId, HabitKind, ProgressDraft};
use habit_core::{HabitProgress, WindowPolicy};
use serde::Serialize;
use services::{AppServices, Clock, TrackerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDate { raw: String },
    InvalidNow { raw: String },
    InvalidDbUrl { raw: String },
    InvalidPolicy { raw: String },
    InvalidType { raw: String },
    InvalidFrequency { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required for this command"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDate { raw } => {
                write!(f, "invalid --date value (expected YYYY-MM-DD): {raw}")
            }
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidPolicy { raw } => {
                write!(f, "invalid --policy value (expected rolling or calendar): {raw}")
            }
            ArgsError::InvalidType { raw } => write!(
                f,
                "invalid --type value (expected above, below, binary or quantitative): {raw}"
            ),
            ArgsError::InvalidFrequency { raw } => write!(
                f,
                "invalid --frequency value (expected daily, weekly, monthly or yearly): {raw}"
            ),
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

fn required<T>(value: Option<T>, flag: &'static str) -> Result<T, ArgsError> {
    value.ok_or(ArgsError::MissingFlag { flag })
}

fn parse_number<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Dashboard,
    AddHabit,
    EditHabit,
    DeleteHabit,
    Log,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "dashboard" => Some(Self::Dashboard),
            "add-habit" => Some(Self::AddHabit),
            "edit-habit" => Some(Self::EditHabit),
            "delete-habit" => Some(Self::DeleteHabit),
            "log" => Some(Self::Log),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    db_url: Option<String>,
    policy: Option<WindowPolicy>,
    now: Option<DateTime<Utc>>,
    json: bool,
    server_completion: bool,
    id: Option<HabitId>,
    name: Option<String>,
    kind: Option<HabitKind>,
    frequency: Option<Frequency>,
    target: Option<f64>,
    unit: Option<String>,
    value: Option<f64>,
    date: Option<NaiveDate>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = Some(value);
                }
                "--policy" => {
                    let value = require_value(args, "--policy")?;
                    parsed.policy = Some(
                        value
                            .parse()
                            .map_err(|_| ArgsError::InvalidPolicy { raw: value.clone() })?,
                    );
                }
                "--now" => {
                    let value = require_value(args, "--now")?;
                    let now = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    parsed.now = Some(now);
                }
                "--json" => parsed.json = true,
                "--server-completion" => parsed.server_completion = true,
                "--id" | "--habit" => {
                    let flag = if arg == "--id" { "--id" } else { "--habit" };
                    let value = require_value(args, flag)?;
                    parsed.id = Some(
                        value
                            .parse()
                            .map_err(|_| ArgsError::InvalidNumber { flag, raw: value })?,
                    );
                }
                "--name" => parsed.name = Some(require_value(args, "--name")?),
                "--type" => {
                    let value = require_value(args, "--type")?;
                    parsed.kind = Some(
                        value
                            .parse()
                            .map_err(|_| ArgsError::InvalidType { raw: value.clone() })?,
                    );
                }
                "--frequency" => {
                    let value = require_value(args, "--frequency")?;
                    parsed.frequency = Some(
                        value
                            .parse()
                            .map_err(|_| ArgsError::InvalidFrequency { raw: value.clone() })?,
                    );
                }
                "--target" => {
                    let value = require_value(args, "--target")?;
                    parsed.target = Some(parse_number("--target", value)?);
                }
                "--unit" => parsed.unit = Some(require_value(args, "--unit")?),
                "--value" => {
                    let value = require_value(args, "--value")?;
                    parsed.value = Some(parse_number("--value", value)?);
                }
                "--date" => {
                    let value = require_value(args, "--date")?;
                    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                        .map_err(|_| ArgsError::InvalidDate { raw: value.clone() })?;
                    parsed.date = Some(date);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    /// Habit fields for `add-habit` and `edit-habit`; an edit replaces every field.
    fn habit_draft(&self) -> Result<HabitDraft, ArgsError> {
        let kind = required(self.kind, "--type")?;
        Ok(HabitDraft {
            name: required(self.name.clone(), "--name")?,
            mode: kind.mode(),
            frequency: required(self.frequency, "--frequency")?,
            target: kind.resolve_target(self.target),
            unit: self.unit.clone(),
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [dashboard] [--json]");
    eprintln!("  cargo run -p app -- add-habit --name <text> --type <type> --frequency <freq> [--target <n>] [--unit <text>]");
    eprintln!("  cargo run -p app -- edit-habit --id <id> --name <text> --type <type> --frequency <freq> [--target <n>] [--unit <text>]");
    eprintln!("  cargo run -p app -- delete-habit --id <id>");
    eprintln!("  cargo run -p app -- log --habit <id> --value <n> [--date YYYY-MM-DD]");
    eprintln!();
    eprintln!("Common options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:habits.sqlite3)");
    eprintln!("  --policy <policy>         rolling (default) or calendar");
    eprintln!("  --now <rfc3339>           Evaluate at a fixed time");
    eprintln!("  --server-completion       Judge completion on the current calendar period");
    eprintln!();
    eprintln!("Types: above, below, binary, quantitative");
    eprintln!("Frequencies: daily, weekly, monthly, yearly");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  HABIT_DB_URL, HABIT_WINDOW_POLICY, HABIT_SERVER_COMPLETION, RUST_LOG");
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.starts_with("sqlite:file:")
    {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.starts_with("sqlite:file:") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    // the pool creates the file itself, but not missing directories
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct CardView<'a> {
    habit: &'a Habit,
    #[serde(flatten)]
    progress: &'a HabitProgress,
}

fn render_card(habit: &Habit, card: &HabitProgress) -> String {
    let status = if card.completed { "done" } else { "open" };
    let unit = habit.unit().map(|unit| format!(" {unit}")).unwrap_or_default();
    let mut line = format!(
        "#{id:<3} {name:<24} {frequency:<7} {ratio}{unit} ({percentage:.0}%) {status}",
        id = habit.id(),
        name = habit.name(),
        frequency = habit.frequency(),
        ratio = card.projection.ratio_text,
        percentage = card.projection.percentage,
    );
    if card.projection.exceeded {
        line.push_str(" exceeded");
    }
    if card.show_streak
        && let Some(streak) = card.streak
    {
        line.push_str(&format!(" streak {streak}"));
    }
    line
}

async fn print_dashboard(app: &AppServices, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(err) = app.stats().recompute_all().await {
        eprintln!("warning: streaks not recomputed: {err}");
    }
    let dashboard = app.dashboard();
    let report = dashboard.refresh_all().await;
    for error in report.errors() {
        eprintln!("warning: {error}");
    }

    let snapshot = dashboard.snapshot().await;
    let cards = dashboard.cards().await;
    let rows = snapshot.habits.iter().zip(cards.iter());

    if json {
        let views: Vec<CardView<'_>> = rows
            .map(|(habit, progress)| CardView { habit, progress })
            .collect();
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if cards.is_empty() {
        println!("No habits yet. Add one with `add-habit`.");
        return Ok(());
    }
    println!("Window policy: {}", dashboard.policy());
    for (habit, card) in rows {
        println!("{}", render_card(habit, card));
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Dashboard,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Dashboard,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            let err = ArgsError::UnknownCommand(first.to_string());
            eprintln!("{err}");
            print_usage();
            err
        })?,
    };
    if argv.first().is_some_and(|first| !first.starts_with("--")) {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let args = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let mut config = TrackerConfig::from_env()?;
    if let Some(db_url) = args.db_url.clone() {
        config.db_url = db_url;
    }
    if let Some(policy) = args.policy {
        config.window_policy = policy;
    }
    config.server_completion |= args.server_completion;
    config.db_url = normalize_sqlite_url(config.db_url);
    tracing::debug!(db_url = %config.db_url, policy = %config.window_policy, "starting");

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&config.db_url)?;
    let clock = args.now.map_or_else(Clock::default_clock, Clock::fixed);
    let app = AppServices::new_sqlite(config, clock).await?;

    match cmd {
        Command::Dashboard => print_dashboard(&app, args.json).await?,
        Command::AddHabit => {
            let habit = app.habits().create_habit(args.habit_draft()?).await?;
            println!("Created habit #{} ({})", habit.id(), habit.name());
        }
        Command::EditHabit => {
            let id = required(args.id, "--id")?;
            let habit = app.habits().update_habit(id, args.habit_draft()?).await?;
            println!("Updated habit #{} ({})", habit.id(), habit.name());
        }
        Command::DeleteHabit => {
            let id = required(args.id, "--id")?;
            app.habits().delete_habit(id).await?;
            println!("Deleted habit #{id} and its progress");
        }
        Command::Log => {
            let draft = ProgressDraft {
                habit_id: required(args.id, "--habit")?,
                date: args.date,
                value: required(args.value, "--value")?,
            };
            let entry = app.progress().log_progress(draft).await?;
            println!(
                "Logged {} for habit #{}",
                entry.value().unwrap_or_default(),
                entry.habit_id()
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use habit_core::model::ComparisonMode;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(&mut iter)
    }

    #[test]
    fn binary_type_always_targets_one() {
        let args = parse(&["--name", "Meditate", "--type", "binary", "--frequency", "daily"]).unwrap();
        let draft = args.habit_draft().unwrap();
        assert_eq!(draft.mode, ComparisonMode::Above);
        assert_eq!(draft.target, 1.0);

        let args = parse(&[
            "--name", "Meditate", "--type", "binary", "--frequency", "daily", "--target", "5",
        ])
        .unwrap();
        assert_eq!(args.habit_draft().unwrap().target, 1.0);
    }

    #[test]
    fn habit_draft_requires_core_fields() {
        let args = parse(&["--name", "Walk", "--type", "above"]).unwrap();
        assert!(matches!(
            args.habit_draft(),
            Err(ArgsError::MissingFlag { flag: "--frequency" })
        ));
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(
            parse(&["--value", "lots"]),
            Err(ArgsError::InvalidNumber { flag: "--value", .. })
        ));
        assert!(matches!(
            parse(&["--date", "14/11/2023"]),
            Err(ArgsError::InvalidDate { .. })
        ));
        assert!(matches!(
            parse(&["--policy", "fortnightly"]),
            Err(ArgsError::InvalidPolicy { .. })
        ));
        assert!(matches!(parse(&["--db"]), Err(ArgsError::MissingValue { flag: "--db" })));
    }

    #[test]
    fn habit_alias_reports_its_own_flag() {
        assert!(matches!(
            parse(&["--habit", "x"]),
            Err(ArgsError::InvalidNumber { flag: "--habit", .. })
        ));
        assert!(matches!(
            parse(&["--id", "x"]),
            Err(ArgsError::InvalidNumber { flag: "--id", .. })
        ));
        assert!(matches!(parse(&["--habit"]), Err(ArgsError::MissingValue { flag: "--habit" })));
        assert_eq!(parse(&["--habit", "7"]).unwrap().id, Some(HabitId::new(7)));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute_urls() {
        let url = normalize_sqlite_url("sqlite:habits.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("habits.sqlite3"));
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
    }
}
