use chrono::{Duration, NaiveDate, NaiveDateTime};
use time_planner_mcp::*;

fn wednesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 16).unwrap()
}

fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, minute, 0).unwrap()
}

fn task(title: &str, date: NaiveDate, minutes: i64, priority: Priority) -> TimeSlot {
    let start = at(date, 9, 0);
    TimeSlot::new(NewTimeSlot::new(title, start, start + Duration::minutes(minutes)).priority(priority)).unwrap()
}

fn schedule() -> ScheduleService {
    ScheduleService::new(SlotStore::new())
}

#[test]
fn test_daily_plan_works_around_existing_slots() {
    let mut schedule = schedule();
    let prefs = UserPreferences::default();
    let date = wednesday();

    let focus = NewTimeSlot::new("Deep work", at(date, 7, 0), at(date, 10, 0)).task_type(TaskType::Fixed);
    schedule
        .add_slot_to_day(date, TimeSlot::new(focus).unwrap())
        .unwrap();

    let outcome = PlanningService::new().generate_daily_plan(
        &mut schedule,
        date,
        vec![task("Email", date, 60, Priority::Medium)],
        &prefs,
    );

    let titles: Vec<_> = outcome.schedule.slots().iter().map(|s| s.title.as_str()).collect();
    // Breakfast at 08:00 falls inside the fixed block and is skipped
    assert_eq!(titles, vec!["Deep work", "Email", "Lunch", "Dinner"]);
    let email = outcome.schedule.slot(outcome.placed[0]).unwrap();
    assert_eq!(email.start_time, at(date, 10, 0));
    assert!(outcome.unplaced.is_empty());

    // The plan was written into the service's day
    assert_eq!(schedule.day(date).unwrap().len(), 4);
}

#[test]
fn test_daily_plan_respects_fixed_meals() {
    let mut schedule = schedule();
    let prefs = UserPreferences {
        flexible_meal_time: false,
        ..UserPreferences::default()
    };
    let date = wednesday();

    let outcome = PlanningService::new().generate_daily_plan(&mut schedule, date, Vec::new(), &prefs);

    assert_eq!(outcome.schedule.len(), 3);
    assert!(outcome.schedule.slots().iter().all(|s| s.task_type == TaskType::Fixed));
    assert_eq!(outcome.schedule.total_duration(), 3 * prefs.meal_duration);
}

#[test]
fn test_weekly_plan_spills_to_next_day_when_busy() {
    let mut schedule = schedule();
    let prefs = UserPreferences::default();
    let monday = NaiveDate::from_ymd_opt(2025, 7, 14).unwrap();

    let tasks: Vec<_> = (1..=6)
        .map(|n| task(&format!("Block {}", n), monday, 120, Priority::High))
        .collect();
    let outcome = PlanningService::new().generate_weekly_plan(&mut schedule, monday, tasks, &prefs);

    assert_eq!(outcome.placed.len(), 6);
    let week = &outcome.schedule;
    // Monday takes tasks until it passes eight committed hours
    assert_eq!(week.day(0).unwrap().len(), 5);
    assert_eq!(week.day(0).unwrap().total_duration(), 600);
    let tuesday = week.day(1).unwrap();
    assert_eq!(tuesday.len(), 1);
    assert_eq!(tuesday.slots()[0].start_time, at(monday + Duration::days(1), 7, 0));
    assert_eq!(week.total_tasks(), 6);
}

#[test]
fn test_weekly_plan_places_higher_priority_first() {
    let mut schedule = schedule();
    let prefs = UserPreferences::default();
    let monday = NaiveDate::from_ymd_opt(2025, 7, 14).unwrap();

    let tasks = vec![
        task("Later", monday, 60, Priority::Low),
        task("First", monday, 60, Priority::Urgent),
    ];
    let outcome = PlanningService::new().generate_weekly_plan(&mut schedule, monday, tasks, &prefs);

    let slots = outcome.schedule.day(0).unwrap().slots();
    assert_eq!(slots[0].title, "First");
    assert_eq!(slots[0].start_time, at(monday, 7, 0));
    assert_eq!(slots[1].title, "Later");
}

#[test]
fn test_optimize_leaves_conflict_free_day_alone() {
    let prefs = UserPreferences::default();
    let date = wednesday();
    let mut day = DaySchedule::new(date);
    let morning = NewTimeSlot::new("Planning", at(date, 9, 0), at(date, 10, 0)).priority(Priority::High);
    day.add_slot(TimeSlot::new(morning).unwrap()).unwrap();
    let before = day.clone();

    let outcome = PlanningService::new().optimize_schedule(&mut day, &prefs);

    assert!(outcome.resolved.is_empty());
    assert!(outcome.unresolved.is_empty());
    assert!(outcome.outside_productive_hours.is_empty());
    assert_eq!(day, before);
}

#[test]
fn test_optimize_flags_urgent_work_outside_productive_hours() {
    let prefs = UserPreferences::default();
    let date = wednesday();
    let late = TimeSlot::new(
        NewTimeSlot::new("Hotfix", at(date, 20, 0), at(date, 21, 0)).priority(Priority::Urgent),
    )
    .unwrap();
    let late_id = late.id;
    let mut day = DaySchedule::from_existing(date, vec![late]);

    let outcome = PlanningService::new().optimize_schedule(&mut day, &prefs);
    assert_eq!(outcome.outside_productive_hours, vec![late_id]);
}
