/// Snapshot persistence through the JSON and SQLite backends
use chrono::{NaiveDate, NaiveTime};
use tempfile::tempdir;
use time_planner_mcp::service::{NewDailyTask, NewWeeklyTask, WeekSpec};
use time_planner_mcp::storage::{decode_snapshot, encode_snapshot};
use time_planner_mcp::*;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn clock() -> FixedClock {
    FixedClock::at(date("2025-07-16"), 9, 0)
}

fn populate<S: SnapshotStore>(service: &mut TimeManagementService<S, FixedClock>) {
    service
        .add_daily_task(
            NewDailyTask::new("Team sync", "2025-07-16", "14:00", "15:00")
                .fixed()
                .description("Weekly sync"),
        )
        .unwrap();
    service
        .add_daily_task(NewDailyTask::new("Podcast", "2025-07-17", "08:00", "09:00").parallel(true))
        .unwrap();
    service
        .add_weekly_task(NewWeeklyTask::new("Ship release", 3, WeeklyPriority::High).parent_project("Launch"))
        .unwrap();
    service
        .add_weekly_task(NewWeeklyTask::new("Fix outage", 3, WeeklyPriority::Critical))
        .unwrap();
}

#[test]
fn test_json_store_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("time_management_data.json");

    let original = {
        let mut service = TimeManagementService::open(JsonFileStore::new(&path), clock(), Some(date("2025-07-01")));
        populate(&mut service);
        service.snapshot().clone()
    };

    let reopened = TimeManagementService::new(JsonFileStore::new(&path), clock());
    assert_eq!(reopened.snapshot(), &original);
    assert_eq!(reopened.start_date(), date("2025-07-01"));
    assert_eq!(reopened.weekly_schedule(WeekSpec::Number(3)).unwrap().tasks[0].name, "Fix outage");

    // No temporary file is left behind
    assert!(!dir.path().join("time_management_data.json.tmp").exists());
}

#[test]
fn test_sqlite_store_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("time_management_data.db");

    let original = {
        let store = SqliteStore::new(&path).unwrap();
        let mut service = TimeManagementService::open(store, clock(), Some(date("2025-07-01")));
        populate(&mut service);
        service.snapshot().clone()
    };

    let reopened = TimeManagementService::new(SqliteStore::new(&path).unwrap(), clock());
    assert_eq!(reopened.snapshot(), &original);
}

#[test]
fn test_encode_decode_preserves_structure() {
    let mut service = TimeManagementService::open(MemoryStore::new(), clock(), Some(date("2025-07-01")));
    populate(&mut service);

    let text = encode_snapshot(service.snapshot()).unwrap();
    let decoded = decode_snapshot(&text).unwrap();
    assert_eq!(&decoded, service.snapshot());
    assert_eq!(text, service.export_json().unwrap());
}

#[test]
fn test_legacy_document_is_accepted() {
    let legacy = r#"{
        "start_date": "2025-07-01",
        "daily_schedules": {
            "2025-07-16": {
                "date": "2025-07-16",
                "week_number": 3,
                "tasks": [
                    { "task_name": "Lunch", "belong_to_day": "2025-07-16", "start_time": "12:00", "end_time": "13:00" },
                    { "task_name": "Standup", "belong_to_day": "2025-07-16", "start_time": "09:00", "end_time": "09:15",
                      "description": "", "can_reschedule": false, "can_compress": false, "can_parallel": false }
                ]
            }
        },
        "weekly_schedules": {
            "3": {
                "week_number": 3,
                "date_range": "2025-07-15 - 2025-07-21",
                "tasks": [
                    { "task_name": "Review", "belong_to_week": 3, "priority": "low" },
                    { "task_name": "Deploy", "belong_to_week": 3, "priority": "critical" }
                ]
            }
        }
    }"#;

    let data = decode_snapshot(legacy).unwrap();
    assert_eq!(data.version, SNAPSHOT_VERSION);

    let day = &data.daily_schedules[&date("2025-07-16")];
    assert_eq!(day.tasks[0].name, "Standup");
    assert!(day.tasks[1].can_reschedule);
    assert_ne!(day.tasks[0].id, day.tasks[1].id);

    let week = &data.weekly_schedules[&3];
    assert_eq!(week.tasks[0].name, "Deploy");
}

#[test]
fn test_newer_version_is_rejected_and_startup_falls_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("future.json");
    let future = r#"{ "version": 99, "start_date": "2025-07-01" }"#;
    std::fs::write(&path, future).unwrap();

    assert!(matches!(
        decode_snapshot(future),
        Err(StorageError::UnsupportedVersion { found: 99, .. })
    ));

    let service = TimeManagementService::new(JsonFileStore::new(&path), clock());
    assert_eq!(service.start_date(), date("2025-07-16"));
    assert_eq!(service.snapshot().daily_task_count(), 0);
    // The unreadable file is not overwritten at startup
    assert_eq!(std::fs::read_to_string(&path).unwrap(), future);
}

#[test]
fn test_corrupt_file_starts_fresh() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    let mut service = TimeManagementService::open(JsonFileStore::new(&path), clock(), Some(date("2025-07-01")));
    assert_eq!(service.snapshot().daily_task_count(), 0);

    // The next mutation replaces the broken file
    service
        .add_daily_task(NewDailyTask::new("Recover", "today", "10:00", "11:00"))
        .unwrap();
    let reopened = TimeManagementService::new(JsonFileStore::new(&path), clock());
    assert_eq!(reopened.snapshot().daily_task_count(), 1);
}

#[test]
fn test_corrupt_sqlite_file_is_set_aside() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("time_management_data.db");
    std::fs::write(&path, "this is not a database").unwrap();

    let store = StorageBackend::Sqlite.open(&path).unwrap();
    let mut service = TimeManagementService::open(store, clock(), Some(date("2025-07-01")));
    assert_eq!(service.snapshot().daily_task_count(), 0);
    service
        .add_daily_task(NewDailyTask::new("Recover", "today", "10:00", "11:00"))
        .unwrap();

    let kept: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("time_management_data.db.unreadable-"))
        .collect();
    assert_eq!(kept.len(), 1);
    assert_eq!(
        std::fs::read_to_string(dir.path().join(&kept[0])).unwrap(),
        "this is not a database"
    );

    let reopened = TimeManagementService::new(SqliteStore::new(&path).unwrap(), clock());
    assert_eq!(reopened.snapshot().daily_task_count(), 1);
}

#[test]
fn test_server_starts_on_corrupt_sqlite_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.db");
    std::fs::write(&path, "garbage").unwrap();

    let server = TimePlannerServer::new(ServerConfig {
        data_file: path.clone(),
        backend: StorageBackend::Sqlite,
        preferences_file: None,
        epoch: None,
    })
    .unwrap();
    assert_eq!(server.service().snapshot().daily_task_count(), 0);
    assert!(path.exists());
}

#[test]
fn test_seconds_do_not_survive_a_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("time_management_data.json");
    let mut service = TimeManagementService::open(JsonFileStore::new(&path), clock(), Some(date("2025-07-01")));

    // Truncated to 10:00 - 10:00, which is empty
    assert!(service
        .add_daily_task(NewDailyTask::new("Blip", "today", "10:00:10", "10:00:50"))
        .is_err());
    let kept = service
        .add_daily_task(NewDailyTask::new("Focus", "today", "10:00:30", "11:15:59"))
        .unwrap();
    assert_eq!(kept.start_time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    assert_eq!(kept.end_time, NaiveTime::from_hms_opt(11, 15, 0).unwrap());

    let reopened = TimeManagementService::new(JsonFileStore::new(&path), clock());
    assert_eq!(reopened.snapshot(), service.snapshot());
}

#[test]
fn test_sqlite_load_drops_inverted_tasks() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("time_management_data.db");
    {
        let store = SqliteStore::new(&path).unwrap();
        let mut service = TimeManagementService::open(store, clock(), Some(date("2025-07-01")));
        populate(&mut service);
    }
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute("UPDATE daily_tasks SET end_time = start_time WHERE name = 'Podcast'", [])
            .unwrap();
    }

    let reopened = TimeManagementService::new(SqliteStore::new(&path).unwrap(), clock());
    assert_eq!(reopened.snapshot().daily_task_count(), 1);
    assert!(reopened.find_daily_task_by_name("2025-07-17", "Podcast").is_err());
}

#[test]
fn test_slot_store_persists_slots() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("slots.json");
    let start = date("2025-07-16").and_hms_opt(9, 0, 0).unwrap();
    let end = date("2025-07-16").and_hms_opt(10, 0, 0).unwrap();

    let id = {
        let mut store = SlotStore::open(&path).unwrap();
        store
            .create_slot(NewTimeSlot::new("Focus", start, end).priority(Priority::High))
            .unwrap()
            .id
    };

    let store = SlotStore::open(&path).unwrap();
    let slot = store.get_slot(id).unwrap();
    assert_eq!(slot.title, "Focus");
    assert_eq!(slot.priority, Priority::High);
}
