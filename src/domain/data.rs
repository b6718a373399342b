/// Top-level aggregate of the coarse model
///
/// The epoch date plus every day and week container. This is the unit of
/// persistence: loaded whole at startup and written whole after each
/// mutation.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::time_utils::{calculate_week_number, week_date_range_label};
use crate::domain::{DailySchedule, DailyTask, DailyTaskId, DomainError, WeeklySchedule, WeeklyTask, WeeklyTaskId};

/// Snapshot format version written by this build
pub const SNAPSHOT_VERSION: u32 = 1;

fn legacy_version() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeManagementData {
    /// Files written before versioning have no tag and count as version 1
    #[serde(default = "legacy_version")]
    pub version: u32,
    /// First day the system was used; week 1 starts here
    pub start_date: NaiveDate,
    #[serde(default)]
    pub daily_schedules: BTreeMap<NaiveDate, DailySchedule>,
    #[serde(default)]
    pub weekly_schedules: BTreeMap<u32, WeeklySchedule>,
}

impl TimeManagementData {
    pub fn new(start_date: NaiveDate) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            start_date,
            daily_schedules: BTreeMap::new(),
            weekly_schedules: BTreeMap::new(),
        }
    }

    pub fn week_number(&self, date: NaiveDate) -> u32 {
        calculate_week_number(self.start_date, date)
    }

    /// Day container for `date`, created on demand
    pub fn day_mut(&mut self, date: NaiveDate) -> &mut DailySchedule {
        let week_number = self.week_number(date);
        self.daily_schedules
            .entry(date)
            .or_insert_with(|| DailySchedule::new(date, week_number))
    }

    /// Week container for `week_number`, created on demand with its date range
    pub fn week_mut(&mut self, week_number: u32) -> Result<&mut WeeklySchedule, DomainError> {
        WeeklyTask::validate_week(week_number)?;
        let start_date = self.start_date;
        match self.weekly_schedules.entry(week_number) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let label = week_date_range_label(start_date, week_number)?;
                Ok(entry.insert(WeeklySchedule::new(week_number, label)))
            }
        }
    }

    /// Date of the day container holding task `id`
    pub fn locate_daily_task(&self, id: DailyTaskId) -> Option<NaiveDate> {
        self.daily_schedules
            .iter()
            .find(|(_, day)| day.task(id).is_some())
            .map(|(date, _)| *date)
    }

    pub fn daily_task(&self, id: DailyTaskId) -> Option<&DailyTask> {
        self.daily_schedules.values().find_map(|day| day.task(id))
    }

    /// Week number of the container holding task `id`
    pub fn locate_weekly_task(&self, id: WeeklyTaskId) -> Option<u32> {
        self.weekly_schedules
            .iter()
            .find(|(_, week)| week.task(id).is_some())
            .map(|(number, _)| *number)
    }

    pub fn weekly_task(&self, id: WeeklyTaskId) -> Option<&WeeklyTask> {
        self.weekly_schedules.values().find_map(|week| week.task(id))
    }

    /// Drop the day container for `date` if it holds no tasks
    pub fn prune_day(&mut self, date: NaiveDate) {
        if self
            .daily_schedules
            .get(&date)
            .is_some_and(|day| day.tasks.is_empty())
        {
            self.daily_schedules.remove(&date);
        }
    }

    pub fn daily_task_count(&self) -> usize {
        self.daily_schedules.values().map(|day| day.tasks.len()).sum()
    }

    pub fn weekly_task_count(&self) -> usize {
        self.weekly_schedules.values().map(|week| week.tasks.len()).sum()
    }

    /// Restore container invariants after loading an older or hand-edited file
    ///
    /// Re-sorts every container, aligns task dates and week numbers with the
    /// container keys and stamps the current version. Daily tasks whose end
    /// is not after their start, and weeks outside the valid range, are
    /// dropped with a warning.
    pub fn normalize(&mut self) {
        let start_date = self.start_date;
        for (date, day) in self.daily_schedules.iter_mut() {
            day.date = *date;
            day.week_number = calculate_week_number(start_date, *date);
            for task in day.tasks.iter_mut() {
                task.date = *date;
            }
            day.tasks.retain(|task| {
                let valid = task.end_time > task.start_time;
                if !valid {
                    warn!(
                        "Dropping daily task '{}' on {}: end {} is not after start {}",
                        task.name, date, task.end_time, task.start_time
                    );
                }
                valid
            });
            day.sort();
        }
        self.weekly_schedules.retain(|number, week| {
            let valid = WeeklyTask::validate_week(*number).is_ok();
            if !valid {
                warn!("Dropping week {} with {} tasks: week number out of range", number, week.tasks.len());
            }
            valid
        });
        for (number, week) in self.weekly_schedules.iter_mut() {
            week.week_number = *number;
            for task in week.tasks.iter_mut() {
                task.week = *number;
            }
            week.sort();
        }
        self.daily_schedules.retain(|_, day| !day.tasks.is_empty());
        self.version = SNAPSHOT_VERSION;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WeeklyPriority;
    use chrono::NaiveTime;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn test_containers_created_on_demand() {
        let mut data = TimeManagementData::new(d("2025-07-01"));
        assert_eq!(data.day_mut(d("2025-07-16")).week_number, 3);
        assert_eq!(data.week_mut(2).unwrap().date_range, "2025-07-08 - 2025-07-14");
        assert_eq!(data.daily_schedules.len(), 1);
        assert_eq!(data.weekly_schedules.len(), 1);
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let mut data = TimeManagementData::new(d("2025-07-01"));
        let task = DailyTask::new("Team sync", d("2025-07-16"), t(14), t(15))
            .unwrap()
            .with_description("weekly")
            .with_flags(false, true, false);
        data.day_mut(d("2025-07-16")).insert(task);
        data.week_mut(1)
            .unwrap()
            .insert(WeeklyTask::new("Read", 1, WeeklyPriority::High).unwrap().with_parent_project(Some("Learning".to_string())));

        let json = serde_json::to_string(&data).unwrap();
        let restored: TimeManagementData = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn test_legacy_document_without_version() {
        let json = r#"{
            "start_date": "2025-07-01",
            "daily_schedules": {
                "2025-07-16": {
                    "date": "2025-07-16",
                    "week_number": 3,
                    "tasks": [
                        {"task_name": "B", "belong_to_day": "2025-07-16", "start_time": "15:00", "end_time": "16:00"},
                        {"task_name": "A", "belong_to_day": "2025-07-16", "start_time": "09:00", "end_time": "10:00"}
                    ]
                }
            },
            "weekly_schedules": {
                "1": {"week_number": 1, "date_range": "2025-07-01 - 2025-07-07", "tasks": []}
            }
        }"#;
        let mut data: TimeManagementData = serde_json::from_str(json).unwrap();
        assert_eq!(data.version, 1);
        data.normalize();

        let day = &data.daily_schedules[&d("2025-07-16")];
        assert_eq!(day.tasks[0].name, "A");
        assert_ne!(day.tasks[0].id, day.tasks[1].id);
        assert!(data.weekly_schedules.contains_key(&1));
    }

    #[test]
    fn test_normalize_drops_records_that_break_invariants() {
        let json = r#"{
            "start_date": "2025-07-01",
            "daily_schedules": {
                "2025-07-16": {
                    "date": "2025-07-16",
                    "week_number": 3,
                    "tasks": [
                        {"name": "Blip", "date": "2025-07-16", "start_time": "10:00:10", "end_time": "10:00:50"},
                        {"name": "Backwards", "date": "2025-07-16", "start_time": "12:00", "end_time": "11:00"}
                    ]
                },
                "2025-07-17": {
                    "date": "2025-07-17",
                    "week_number": 3,
                    "tasks": [
                        {"name": "Review", "date": "2025-07-17", "start_time": "09:00", "end_time": "10:00"}
                    ]
                }
            },
            "weekly_schedules": {
                "99999999": {"week_number": 99999999, "date_range": "", "tasks": []}
            }
        }"#;
        let mut data: TimeManagementData = serde_json::from_str(json).unwrap();
        data.normalize();

        assert_eq!(data.daily_task_count(), 1);
        assert!(!data.daily_schedules.contains_key(&d("2025-07-16")));
        assert!(data.weekly_schedules.is_empty());
    }

    #[test]
    fn test_week_container_out_of_range_is_refused() {
        let mut data = TimeManagementData::new(d("2025-07-01"));
        assert!(data.week_mut(0).is_err());
        assert!(data.week_mut(100_000_000).is_err());
        assert!(data.weekly_schedules.is_empty());
    }

    #[test]
    fn test_locate_and_prune() {
        let mut data = TimeManagementData::new(d("2025-07-01"));
        let task = DailyTask::new("Gym", d("2025-07-02"), t(7), t(8)).unwrap();
        let id = task.id;
        data.day_mut(d("2025-07-02")).insert(task);

        assert_eq!(data.locate_daily_task(id), Some(d("2025-07-02")));
        data.prune_day(d("2025-07-02"));
        assert_eq!(data.daily_task_count(), 1);

        data.day_mut(d("2025-07-02")).remove(id);
        data.prune_day(d("2025-07-02"));
        assert!(data.daily_schedules.is_empty());
    }
}
