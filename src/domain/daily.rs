/// Day-scoped tasks of the coarse model
///
/// A daily task belongs to one calendar date and carries its start and end
/// as clock times. Snapshots written by older versions used `task_name` and
/// `belong_to_day` and had no id; both are still accepted on read.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::conflict::{detect_conflicts, find_conflict, Scheduled};
use crate::domain::time_utils::{hhmm, truncate_to_minute};
use crate::domain::{validate_name, DailyTaskId, DomainError};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTask {
    /// Legacy records without an id receive a fresh one on load
    #[serde(default)]
    pub id: DailyTaskId,
    #[serde(alias = "task_name")]
    pub name: String,
    #[serde(alias = "belong_to_day")]
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub description: String,
    /// Whether the planner may move this task to another time
    #[serde(default = "default_true")]
    pub can_reschedule: bool,
    /// Whether the planner may shorten this task
    #[serde(default = "default_true")]
    pub can_compress: bool,
    #[serde(default)]
    pub can_parallel: bool,
    /// Name of the larger task this one was split out of
    #[serde(default)]
    pub parent_task: Option<String>,
}

impl DailyTask {
    /// Create a new task with validation
    ///
    /// Defaults: reschedulable, compressible, not parallel. Times keep
    /// minute precision only.
    pub fn new(
        name: impl Into<String>,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        let (start_time, end_time) = (truncate_to_minute(start_time), truncate_to_minute(end_time));
        validate_name(&name)?;
        Self::validate_times(date, start_time, end_time)?;

        Ok(Self {
            id: DailyTaskId::new(),
            name: name.trim().to_string(),
            date,
            start_time,
            end_time,
            description: String::new(),
            can_reschedule: true,
            can_compress: true,
            can_parallel: false,
            parent_task: None,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_flags(mut self, can_reschedule: bool, can_compress: bool, can_parallel: bool) -> Self {
        self.can_reschedule = can_reschedule;
        self.can_compress = can_compress;
        self.can_parallel = can_parallel;
        self
    }

    pub fn with_parent(mut self, parent_task: Option<String>) -> Self {
        self.parent_task = parent_task;
        self
    }

    pub fn start(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    pub fn end(&self) -> NaiveDateTime {
        self.date.and_time(self.end_time)
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    pub(crate) fn validate_times(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Result<(), DomainError> {
        if end <= start {
            return Err(DomainError::InvalidTimeRange {
                start: date.and_time(start),
                end: date.and_time(end),
            });
        }
        Ok(())
    }
}

impl Scheduled for DailyTask {
    fn span(&self) -> (NaiveDateTime, NaiveDateTime) {
        (self.start(), self.end())
    }

    fn allows_parallel(&self) -> bool {
        self.can_parallel
    }
}

/// All tasks of one calendar date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySchedule {
    pub date: NaiveDate,
    pub week_number: u32,
    #[serde(default)]
    pub tasks: Vec<DailyTask>,
}

impl DailySchedule {
    pub fn new(date: NaiveDate, week_number: u32) -> Self {
        Self {
            date,
            week_number,
            tasks: Vec::new(),
        }
    }

    /// First existing task that `candidate` would conflict with
    ///
    /// `ignore` skips one task, so a task being edited is not compared
    /// against itself.
    pub fn conflict_for(&self, candidate: &DailyTask, ignore: Option<DailyTaskId>) -> Option<&DailyTask> {
        match ignore {
            None => find_conflict(&self.tasks, candidate),
            Some(id) => self
                .tasks
                .iter()
                .filter(|task| task.id != id)
                .find(|task| candidate.conflicts_with(*task)),
        }
    }

    /// Insert and keep tasks ordered by start time
    pub fn insert(&mut self, task: DailyTask) {
        self.tasks.push(task);
        self.sort();
    }

    pub fn remove(&mut self, id: DailyTaskId) -> Option<DailyTask> {
        let index = self.tasks.iter().position(|task| task.id == id)?;
        Some(self.tasks.remove(index))
    }

    pub fn task(&self, id: DailyTaskId) -> Option<&DailyTask> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn task_mut(&mut self, id: DailyTaskId) -> Option<&mut DailyTask> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    pub fn tasks_named(&self, name: &str) -> Vec<&DailyTask> {
        self.tasks.iter().filter(|task| task.name == name).collect()
    }

    pub fn sort(&mut self) {
        self.tasks.sort_by_key(|task| task.start_time);
    }

    pub fn conflicts(&self) -> Vec<(&DailyTask, &DailyTask)> {
        detect_conflicts(&self.tasks)
    }

    pub fn scheduled_minutes(&self) -> i64 {
        self.tasks.iter().map(DailyTask::duration_minutes).sum()
    }
}
