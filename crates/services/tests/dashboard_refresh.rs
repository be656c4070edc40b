use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use habit_core::WindowPolicy;
use habit_core::model::{
    ComparisonMode, Frequency, HabitDraft, HabitId, NewProgress, ProgressDraft, ProgressEntry,
};
use habit_core::time::fixed_now;
use services::{Clock, DashboardService, RefreshError};
use storage::repository::{
    HabitRepository, InMemoryRepository, ProgressRepository, StatsRepository, StorageError,
};

/// Progress source that can be switched into failing.
struct FlakyProgress {
    inner: InMemoryRepository,
    failing: AtomicBool,
}

#[async_trait]
impl ProgressRepository for FlakyProgress {
    async fn append_progress(&self, progress: NewProgress) -> Result<ProgressEntry, StorageError> {
        self.inner.append_progress(progress).await
    }

    async fn list_progress(&self) -> Result<Vec<ProgressEntry>, StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("progress backend offline".into()));
        }
        self.inner.list_progress().await
    }

    async fn progress_for_habit(
        &self,
        habit_id: HabitId,
    ) -> Result<Vec<ProgressEntry>, StorageError> {
        self.inner.progress_for_habit(habit_id).await
    }
}

fn walk() -> HabitDraft {
    HabitDraft {
        name: "Walk".into(),
        mode: ComparisonMode::Above,
        frequency: Frequency::Daily,
        target: 10_000.0,
        unit: Some("steps".into()),
    }
}

fn log(habit_id: HabitId, value: f64) -> NewProgress {
    ProgressDraft {
        habit_id,
        date: None,
        value,
    }
    .validate(fixed_now().date_naive())
    .unwrap()
}

#[tokio::test]
async fn failed_source_keeps_previous_snapshot_and_others_refresh() {
    let repo = InMemoryRepository::new();
    let flaky = Arc::new(FlakyProgress {
        inner: repo.clone(),
        failing: AtomicBool::new(false),
    });
    let today = fixed_now().date_naive();
    let habit = repo
        .insert_new_habit(walk().validate().unwrap(), today)
        .await
        .unwrap();
    flaky.append_progress(log(habit.id(), 3000.0)).await.unwrap();

    let service = DashboardService::new(
        Clock::fixed(fixed_now()),
        WindowPolicy::Rolling,
        Arc::new(repo.clone()),
        flaky.clone(),
        Arc::new(repo.clone()),
    );
    assert!(service.refresh_all().await.is_complete());
    assert_eq!(service.cards().await[0].aggregate, 3000.0);

    // New data everywhere, but the progress source goes down.
    flaky.append_progress(log(habit.id(), 4000.0)).await.unwrap();
    repo.set_streak(habit.id(), 6).await.unwrap();
    let mut second = walk();
    second.name = "Stretch".into();
    second.target = 1.0;
    repo.insert_new_habit(second.validate().unwrap(), today)
        .await
        .unwrap();
    flaky.failing.store(true, Ordering::SeqCst);

    let report = service.refresh_all().await;
    assert!(!report.is_complete());
    assert!(matches!(report.progress, Err(RefreshError::Progress(_))));
    assert_eq!(report.habits.as_ref().ok(), Some(&2));
    assert_eq!(report.stats.as_ref().ok(), Some(&1));
    assert_eq!(report.errors().count(), 1);

    let cards = service.cards().await;
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].aggregate, 3000.0, "stale progress is kept");
    assert_eq!(cards[0].streak, Some(6));
    assert!(cards[0].show_streak);

    flaky.failing.store(false, Ordering::SeqCst);
    service.refresh_progress().await.unwrap();
    let cards = service.cards().await;
    assert_eq!(cards[0].aggregate, 7000.0);
    assert_eq!(cards[0].projection.percentage, 70.0);
}

#[tokio::test]
async fn calendar_policy_is_applied_to_cards() {
    let repo = InMemoryRepository::new();
    let habit = repo
        .insert_new_habit(
            HabitDraft {
                name: "Read".into(),
                mode: ComparisonMode::Above,
                frequency: Frequency::Monthly,
                target: 100.0,
                unit: Some("pages".into()),
            }
            .validate()
            .unwrap(),
            fixed_now().date_naive(),
        )
        .await
        .unwrap();
    // fixed_now is 2023-11-14: October entries fall inside the rolling
    // 30 days but outside the calendar month.
    for (day, value) in [("2023-10-20", 40.0), ("2023-11-03", 25.0)] {
        let progress = ProgressDraft {
            habit_id: habit.id(),
            date: day.parse().ok(),
            value,
        }
        .validate(fixed_now().date_naive())
        .unwrap();
        repo.append_progress(progress).await.unwrap();
    }

    let repo = Arc::new(repo);
    let build = |policy| {
        DashboardService::new(
            Clock::fixed(fixed_now()),
            policy,
            repo.clone(),
            repo.clone(),
            repo.clone(),
        )
    };

    let rolling = build(WindowPolicy::Rolling);
    rolling.refresh_all().await;
    assert_eq!(rolling.cards().await[0].aggregate, 65.0);

    let calendar = build(WindowPolicy::CalendarAligned);
    calendar.refresh_all().await;
    assert_eq!(calendar.cards().await[0].aggregate, 25.0);
}
