/// End-to-end scenarios over the coarse scheduling model
use chrono::NaiveDate;
use time_planner_mcp::domain::time_utils::resolve_relative_date;
use time_planner_mcp::service::{DailyTaskPatch, NewDailyTask, NewWeeklyTask, WeekSpec};
use time_planner_mcp::*;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn service_at(today: &str) -> TimeManagementService<MemoryStore, FixedClock> {
    TimeManagementService::open(MemoryStore::new(), FixedClock::at(date(today), 9, 0), Some(date("2025-07-01")))
}

#[test]
fn test_team_sync_conflict_scenario() {
    let mut service = service_at("2025-07-16");

    service
        .add_daily_task(NewDailyTask::new("Team sync", "2025-07-16", "14:00", "15:00").fixed())
        .expect("first task should be accepted");

    let clash = service.add_daily_task(NewDailyTask::new("Code review", "2025-07-16", "14:30", "15:30"));
    match clash {
        Err(ServiceError::Conflict { name, with }) => {
            assert_eq!(name, "Code review");
            assert_eq!(with, "Team sync");
        }
        other => panic!("expected a conflict, got {:?}", other),
    }
    assert_eq!(service.daily_schedule("2025-07-16").unwrap().tasks.len(), 1);

    let review = service
        .add_daily_task(NewDailyTask::new("Code review", "2025-07-16", "15:00", "15:30"))
        .expect("abutting task should be accepted");
    assert_eq!(review.date, date("2025-07-16"));

    let day = service.daily_schedule("today").unwrap();
    let names: Vec<_> = day.tasks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Team sync", "Code review"]);
    assert_eq!(day.week_number, 3);
}

#[test]
fn test_weekly_priority_order_scenario() {
    let mut service = service_at("2025-07-02");

    for (name, priority) in [
        ("Tidy inbox", WeeklyPriority::Low),
        ("Ship release", WeeklyPriority::High),
        ("Fix outage", WeeklyPriority::Critical),
        ("Write docs", WeeklyPriority::Medium),
    ] {
        service.add_weekly_task(NewWeeklyTask::new(name, 1, priority)).unwrap();
    }

    let week = service.weekly_schedule(WeekSpec::Number(1)).unwrap();
    let order: Vec<_> = week.tasks.iter().map(|t| t.priority).collect();
    assert_eq!(
        order,
        vec![
            WeeklyPriority::Critical,
            WeeklyPriority::High,
            WeeklyPriority::Medium,
            WeeklyPriority::Low
        ]
    );
    assert_eq!(week.date_range, "2025-07-01 - 2025-07-07");

    // The current week on 2025-07-02 is week 1 as well
    assert_eq!(service.weekly_schedule(WeekSpec::Current).unwrap().tasks.len(), 4);
}

#[test]
fn test_relative_date_scenario() {
    assert_eq!(resolve_relative_date("tomorrow", date("2025-07-16")), "2025-07-17");
    assert_eq!(resolve_relative_date("2025-08-01", date("1999-01-01")), "2025-08-01");

    let mut service = service_at("2025-07-16");
    let task = service
        .add_daily_task(NewDailyTask::new("Dentist", "tomorrow", "10:00", "11:00"))
        .unwrap();
    assert_eq!(task.date, date("2025-07-17"));
}

#[test]
fn test_duplicate_names_are_ambiguous_but_ids_work() {
    let mut service = service_at("2025-07-16");
    let first = service
        .add_daily_task(NewDailyTask::new("Walk", "today", "07:00", "07:30"))
        .unwrap();
    service
        .add_daily_task(NewDailyTask::new("Walk", "today", "19:00", "19:30"))
        .unwrap();

    assert!(matches!(
        service.find_daily_task_by_name("today", "Walk"),
        Err(ServiceError::Ambiguous { count: 2, .. })
    ));

    service.remove_daily_task(first.id).unwrap();
    let remaining = service.find_daily_task_by_name("today", "Walk").unwrap();
    assert_eq!(remaining.start_time.format("%H:%M").to_string(), "19:00");
}

#[test]
fn test_moving_a_task_between_days() {
    let mut service = service_at("2025-07-16");
    let task = service
        .add_daily_task(NewDailyTask::new("Gym", "today", "18:00", "19:00"))
        .unwrap();

    let patch = DailyTaskPatch {
        date: Some("tomorrow".to_string()),
        ..Default::default()
    };
    let moved = service.update_daily_task(task.id, patch).unwrap();

    assert_eq!(moved.id, task.id);
    assert_eq!(moved.date, date("2025-07-17"));
    // The emptied day container is dropped
    assert!(!service.snapshot().daily_schedules.contains_key(&date("2025-07-16")));
    assert_eq!(service.statistics().total_days, 1);
}

#[test]
fn test_persistence_failure_keeps_memory_state() {
    // Failing saves surface as errors, but the mutation stays in memory
    let store = MemoryStore::new();
    store.set_fail_saves(true);
    let mut failing = TimeManagementService::open(store, FixedClock::at(date("2025-07-16"), 9, 0), None);
    let result = failing.add_daily_task(NewDailyTask::new("Unsaved", "today", "08:00", "09:00"));

    assert!(matches!(result, Err(ServiceError::Persistence(_))));
    assert_eq!(failing.daily_schedule("today").unwrap().tasks.len(), 1);
    assert!(failing.store().stored().is_none());
}
