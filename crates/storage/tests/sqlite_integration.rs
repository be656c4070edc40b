use chrono::NaiveDate;
use habit_core::WindowPolicy;
use habit_core::model::{
    ComparisonMode, Frequency, HabitDraft, HabitId, ProgressDraft, ValidatedHabit,
};
use habit_core::time::fixed_now;
use sqlx::SqlitePool;
use storage::repository::{
    HabitRepository, ProgressRepository, StatsRepository, Storage, StorageError,
};
use storage::sqlite::SqliteRepository;

fn shared_memory_url(name: &str) -> String {
    format!("sqlite:file:{name}?mode=memory&cache=shared")
}

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&shared_memory_url(name))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

/// Second pool on the same shared-cache database, for writing rows the
/// repository itself would never produce.
async fn raw_pool(name: &str) -> SqlitePool {
    SqlitePool::connect(&shared_memory_url(name))
        .await
        .expect("raw pool")
}

fn validated(name: &str, mode: ComparisonMode, target: f64, unit: Option<&str>) -> ValidatedHabit {
    HabitDraft {
        name: name.into(),
        mode,
        frequency: Frequency::Daily,
        target,
        unit: unit.map(str::to_string),
    }
    .validate()
    .unwrap()
}

fn today() -> NaiveDate {
    fixed_now().date_naive()
}

#[tokio::test]
async fn sqlite_roundtrip_persists_habit_fields() {
    let repo = connect("memdb_habit_roundtrip").await;

    let walk = repo
        .insert_new_habit(
            validated("Walk", ComparisonMode::Above, 10_000.0, Some("steps")),
            today(),
        )
        .await
        .unwrap();
    let quit = repo
        .insert_new_habit(
            validated("No smoking", ComparisonMode::Below, 0.0, None),
            today(),
        )
        .await
        .unwrap();

    let fetched = repo.get_habit(walk.id()).await.unwrap().expect("habit");
    assert_eq!(fetched, walk);
    assert_eq!(fetched.unit(), Some("steps"));
    assert_eq!(fetched.start_date(), Some(today()));

    let all = repo.list_habits().await.unwrap();
    assert_eq!(
        all.iter().map(|h| h.id()).collect::<Vec<_>>(),
        vec![walk.id(), quit.id()]
    );
    assert_eq!(all[1].mode(), ComparisonMode::Below);

    let edited = repo
        .update_habit(
            walk.id(),
            validated("Walk more", ComparisonMode::Above, 12_000.0, None),
        )
        .await
        .unwrap();
    assert_eq!(edited.name(), "Walk more");
    assert_eq!(edited.unit(), None);
    assert_eq!(edited.start_date(), Some(today()));

    assert!(repo.get_habit(HabitId::new(999)).await.unwrap().is_none());
    assert!(matches!(
        repo.update_habit(HabitId::new(999), validated("x", ComparisonMode::Above, 1.0, None))
            .await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_delete_cascades_progress_and_streaks() {
    let repo = connect("memdb_cascade").await;

    let keep = repo
        .insert_new_habit(validated("Keep", ComparisonMode::Above, 3.0, None), today())
        .await
        .unwrap();
    let gone = repo
        .insert_new_habit(validated("Gone", ComparisonMode::Above, 3.0, None), today())
        .await
        .unwrap();

    for habit_id in [keep.id(), gone.id(), gone.id()] {
        let progress = ProgressDraft {
            habit_id,
            date: None,
            value: 1.0,
        }
        .validate(today())
        .unwrap();
        repo.append_progress(progress).await.unwrap();
    }
    repo.set_streak(keep.id(), 2).await.unwrap();
    repo.set_streak(gone.id(), 5).await.unwrap();

    repo.delete_habit(gone.id()).await.unwrap();

    let remaining = repo.list_progress().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].habit_id(), keep.id());

    let streaks = repo.streaks().await.unwrap();
    assert_eq!(streaks.streak(keep.id()), Some(2));
    assert_eq!(streaks.streak(gone.id()), None);

    assert!(matches!(
        repo.delete_habit(gone.id()).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_rejects_progress_for_missing_habit() {
    let repo = connect("memdb_orphan_insert").await;
    let progress = ProgressDraft {
        habit_id: HabitId::new(42),
        date: None,
        value: 1.0,
    }
    .validate(today())
    .unwrap();

    assert!(matches!(
        repo.append_progress(progress).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        repo.set_streak(HabitId::new(42), 1).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_loads_legacy_rows_leniently() {
    let repo = connect("memdb_legacy").await;
    let raw = raw_pool("memdb_legacy").await;

    sqlx::query(
        "INSERT INTO habits (id, name, type, frequency, target) VALUES (1, 'Meditate', 'binary', 'daily', NULL)",
    )
    .execute(&raw)
    .await
    .unwrap();
    sqlx::query(
        r"
        INSERT INTO progress_entries (id, habit_id, date, value) VALUES
            (1, 1, '2023-11-14T08:30:00Z', 1.0),
            (2, 1, 'yesterday-ish', 1.0),
            (3, 1, '2023-11-14', NULL)
        ",
    )
    .execute(&raw)
    .await
    .unwrap();

    let habit = repo.get_habit(HabitId::new(1)).await.unwrap().expect("habit");
    assert_eq!(habit.mode(), ComparisonMode::Above);
    assert_eq!(habit.target(), 1.0);
    assert!(habit.is_binary());

    let entries = repo.progress_for_habit(habit.id()).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].date(), Some(today()));
    assert_eq!(entries[1].date(), None);
    assert_eq!(entries[2].value(), None);

    let progress = habit_core::evaluate(
        &habit,
        &entries,
        &repo.streaks().await.unwrap(),
        fixed_now(),
        WindowPolicy::Rolling,
    );
    assert_eq!(progress.aggregate, 1.0);
    assert!(progress.completed);
}

#[tokio::test]
async fn sqlite_keeps_good_rows_next_to_corrupt_ones() {
    let repo = connect("memdb_corrupt").await;
    let raw = raw_pool("memdb_corrupt").await;

    sqlx::query(
        r"
        INSERT INTO habits (id, name, type, frequency, target) VALUES
            (1, 'Water', 'above', 'daily', 8),
            (2, 'Ghost', 'sometimes', 'daily', 1),
            (3, 'Drift', 'below', 'fortnightly', 1)
        ",
    )
    .execute(&raw)
    .await
    .unwrap();
    sqlx::query(
        r"
        INSERT INTO progress_entries (id, habit_id, date, value) VALUES
            (1, 1, '2023-11-14', 3.0),
            (2, 1, '2023-11-14', 'lots'),
            (3, 1, '2023-11-14', '2.5'),
            (4, 1, X'00', 1.0),
            (5, 1, '2023-11-14', X'01')
        ",
    )
    .execute(&raw)
    .await
    .unwrap();

    let habits = repo.list_habits().await.unwrap();
    assert_eq!(
        habits.iter().map(|h| h.id()).collect::<Vec<_>>(),
        vec![HabitId::new(1)]
    );

    let entries = repo.list_progress().await.unwrap();
    assert_eq!(entries.len(), 5);
    assert_eq!(
        entries.iter().map(|e| e.value()).collect::<Vec<_>>(),
        vec![Some(3.0), None, Some(2.5), Some(1.0), None]
    );
    assert_eq!(entries[3].date(), None);
    assert_eq!(repo.progress_for_habit(HabitId::new(1)).await.unwrap().len(), 5);

    let cards = habit_core::evaluate_all(
        &habits,
        &entries,
        &repo.streaks().await.unwrap(),
        fixed_now(),
        WindowPolicy::Rolling,
    );
    assert_eq!(cards[0].aggregate, 5.5);
}

#[tokio::test]
async fn sqlite_binary_row_ignores_its_stored_target() {
    let repo = connect("memdb_binary_target").await;
    let raw = raw_pool("memdb_binary_target").await;
    sqlx::query(
        "INSERT INTO habits (id, name, type, frequency, target) VALUES (1, 'Stretch', 'binary', 'daily', 5)",
    )
    .execute(&raw)
    .await
    .unwrap();

    let habit = repo.get_habit(HabitId::new(1)).await.unwrap().expect("habit");
    assert_eq!(habit.target(), 1.0);
    assert!(habit.is_binary());
}

#[tokio::test]
async fn storage_facade_feeds_the_tracker() {
    let storage = Storage::sqlite("sqlite:file:memdb_facade?mode=memory&cache=shared")
        .await
        .expect("storage");

    let walk = storage
        .habits
        .insert_new_habit(
            validated("Walk", ComparisonMode::Above, 10_000.0, Some("steps")),
            today(),
        )
        .await
        .unwrap();
    for value in [3000.0, 4000.0] {
        let progress = ProgressDraft {
            habit_id: walk.id(),
            date: None,
            value,
        }
        .validate(today())
        .unwrap();
        storage.progress.append_progress(progress).await.unwrap();
    }
    storage.stats.set_streak(walk.id(), 4).await.unwrap();

    let habits = storage.habits.list_habits().await.unwrap();
    let entries = storage.progress.list_progress().await.unwrap();
    let streaks = storage.stats.streaks().await.unwrap();
    let cards = habit_core::evaluate_all(
        &habits,
        &entries,
        &streaks,
        fixed_now(),
        WindowPolicy::Rolling,
    );

    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].aggregate, 7000.0);
    assert_eq!(cards[0].projection.ratio_text, "7000/10000");
    assert!(!cards[0].completed);
    assert!(cards[0].show_streak);
}
