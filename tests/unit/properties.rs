use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use time_planner_mcp::domain::time_utils::{calculate_week_number, overlaps};
use time_planner_mcp::*;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 16).unwrap()
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    day().and_time(hm(hour, minute))
}

fn slot(title: &str, start: NaiveDateTime, end: NaiveDateTime) -> TimeSlot {
    TimeSlot::new(NewTimeSlot::new(title, start, end)).unwrap()
}

#[test]
fn test_end_must_follow_start() {
    assert!(TimeSlot::new(NewTimeSlot::new("Backwards", at(10, 0), at(9, 0))).is_err());
    assert!(TimeSlot::new(NewTimeSlot::new("Empty", at(10, 0), at(10, 0))).is_err());
    assert!(matches!(
        DailyTask::new("Backwards", day(), hm(15, 0), hm(14, 0)),
        Err(DomainError::InvalidTimeRange { .. })
    ));
}

#[test]
fn test_overlap_is_symmetric_and_half_open() {
    let intervals = [(9, 10), (9, 11), (10, 11), (10, 12), (8, 9), (11, 13)];
    for &(a_start, a_end) in &intervals {
        for &(b_start, b_end) in &intervals {
            let ab = overlaps(at(a_start, 0), at(a_end, 0), at(b_start, 0), at(b_end, 0));
            let ba = overlaps(at(b_start, 0), at(b_end, 0), at(a_start, 0), at(a_end, 0));
            assert_eq!(ab, ba, "({a_start}-{a_end}) vs ({b_start}-{b_end})");
        }
    }

    // Abutting intervals do not overlap
    assert!(!overlaps(at(9, 0), at(10, 0), at(10, 0), at(11, 0)));
    assert!(overlaps(at(9, 0), at(10, 1), at(10, 0), at(11, 0)));
}

#[test]
fn test_parallel_flags_decide_identical_intervals() {
    let task = |parallel: bool| {
        DailyTask::new("Podcast", day(), hm(8, 0), hm(9, 0))
            .unwrap()
            .with_flags(true, true, parallel)
    };

    assert!(!task(true).conflicts_with(&task(true)));
    assert!(task(true).conflicts_with(&task(false)));
    assert!(task(false).conflicts_with(&task(true)));
    assert!(task(false).conflicts_with(&task(false)));
}

#[test]
fn test_rejected_slot_leaves_day_untouched() {
    let mut schedule = DaySchedule::new(day());
    schedule.add_slot(slot("Standup", at(9, 0), at(9, 30))).unwrap();
    let before = schedule.clone();

    let clash = schedule.add_slot(slot("Review", at(9, 15), at(10, 0)));
    assert!(matches!(clash, Err(RejectReason::Conflict { ref with }) if with == "Standup"));

    let other_day = NaiveDate::from_ymd_opt(2025, 7, 17).unwrap().and_time(hm(9, 0));
    let wrong = schedule.add_slot(slot("Elsewhere", other_day, other_day + Duration::hours(1)));
    assert!(matches!(wrong, Err(RejectReason::WrongDate { .. })));

    assert_eq!(schedule, before);
    assert_eq!(schedule.total_duration(), 30);
}

#[test]
fn test_slots_stay_sorted_by_start() {
    let mut schedule = DaySchedule::new(day());
    schedule.add_slot(slot("Late", at(16, 0), at(17, 0))).unwrap();
    schedule.add_slot(slot("Early", at(7, 0), at(8, 0))).unwrap();
    schedule.add_slot(slot("Middle", at(12, 0), at(13, 0))).unwrap();

    let titles: Vec<_> = schedule.slots().iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Early", "Middle", "Late"]);
}

#[test]
fn test_week_numbers_count_from_epoch() {
    let epoch = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
    assert_eq!(calculate_week_number(epoch, epoch), 1);
    assert_eq!(calculate_week_number(epoch, epoch + Duration::days(6)), 1);
    assert_eq!(calculate_week_number(epoch, epoch + Duration::days(7)), 2);
    assert_eq!(calculate_week_number(epoch, epoch - Duration::days(30)), 1);
}

#[test]
fn test_free_slots_on_empty_day() {
    let empty: Vec<DailyTask> = Vec::new();
    let slots = find_free_slots(day(), &empty, Duration::minutes(60), TimeWindow::default()).unwrap();

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].start, at(9, 0));
    assert_eq!(slots[0].end, at(10, 0));
    assert_eq!(slots[0].available_minutes, 13 * 60);
}

#[test]
fn test_free_slots_around_existing_entry() {
    let busy = vec![DailyTask::new("Meeting", day(), hm(10, 0), hm(11, 0)).unwrap()];
    let window = TimeWindow::new(hm(9, 0), hm(12, 0)).unwrap();
    let slots = find_free_slots(day(), &busy, Duration::minutes(60), window).unwrap();

    let starts: Vec<_> = slots.iter().map(|s| s.start).collect();
    assert_eq!(starts, vec![at(9, 0), at(11, 0)]);
    assert!(slots.iter().all(|s| s.duration_minutes() == 60));

    // Nothing fits once the request outgrows every gap
    let none = find_free_slots(day(), &busy, Duration::minutes(90), window).unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_free_slot_search_rejects_bad_input() {
    let empty: Vec<DailyTask> = Vec::new();
    assert!(find_free_slots(day(), &empty, Duration::zero(), TimeWindow::default()).is_err());
    assert!(TimeWindow::new(hm(12, 0), hm(9, 0)).is_err());
}
