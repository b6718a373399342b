/// Time management service
///
/// Orchestrates the day and week task containers of `TimeManagementData`:
/// resolves relative dates against the injected clock, enforces the entity
/// invariants, rejects conflicting inserts and writes the whole aggregate
/// back through the `SnapshotStore` after every mutation.

pub mod inputs;

pub use inputs::*;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::domain::time_utils::{parse_hhmm, resolve_date, task_duration};
use crate::domain::{
    find_free_slots, validate_name, Clock, DailySchedule, DailyTask, DailyTaskId, DomainError, FreeSlot,
    TimeManagementData, TimeWindow, WeeklyPriority, WeeklySchedule, WeeklyTask, WeeklyTaskId,
};
use crate::storage::{SnapshotStore, StorageError};

/// Errors returned by service operations
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Domain validation error: {0}")]
    Domain(#[from] DomainError),

    #[error("'{name}' conflicts with existing task '{with}'")]
    Conflict { name: String, with: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("{count} tasks are named '{name}'; use the task id instead")]
    Ambiguous { name: String, count: usize },

    #[error("Failed to persist changes: {0}")]
    Persistence(#[from] StorageError),
}

/// Aggregate counts over the whole data set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub start_date: NaiveDate,
    pub current_week: u32,
    pub total_days: usize,
    pub total_weeks: usize,
    pub total_daily_tasks: usize,
    pub total_weekly_tasks: usize,
    pub weekly_by_priority: BTreeMap<&'static str, usize>,
    pub total_scheduled_minutes: i64,
}

pub struct TimeManagementService<S: SnapshotStore, C: Clock> {
    store: S,
    clock: C,
    data: TimeManagementData,
}

impl<S: SnapshotStore, C: Clock> TimeManagementService<S, C> {
    /// Load the stored aggregate, or start fresh with today as epoch
    pub fn new(store: S, clock: C) -> Self {
        Self::open(store, clock, None)
    }

    /// Load the stored aggregate; `fresh_epoch` only applies when nothing
    /// usable is stored
    pub fn open(store: S, clock: C, fresh_epoch: Option<NaiveDate>) -> Self {
        let epoch = fresh_epoch.unwrap_or_else(|| clock.today());

        let data = match store.load() {
            Ok(Some(data)) => {
                info!(
                    "Loaded schedule data from {}: {} daily tasks, {} weekly tasks",
                    store.describe(),
                    data.daily_task_count(),
                    data.weekly_task_count()
                );
                data
            }
            Ok(None) => {
                info!("No schedule data at {}, starting fresh from {}", store.describe(), epoch);
                let data = TimeManagementData::new(epoch);
                if let Err(e) = store.save(&data) {
                    warn!("Could not write initial snapshot to {}: {}", store.describe(), e);
                }
                data
            }
            Err(e) => {
                // The unreadable file is left in place until the next mutation
                warn!("Could not load schedule data from {}: {}; starting fresh", store.describe(), e);
                TimeManagementData::new(epoch)
            }
        };

        Self { store, clock, data }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Borrow the aggregate
    pub fn snapshot(&self) -> &TimeManagementData {
        &self.data
    }

    pub fn start_date(&self) -> NaiveDate {
        self.data.start_date
    }

    /// Resolve a date or relative term against the clock
    pub fn resolve_date(&self, term: &str) -> Result<NaiveDate, ServiceError> {
        Ok(resolve_date(term, self.clock.today())?)
    }

    pub fn week_number(&self, date: NaiveDate) -> u32 {
        self.data.week_number(date)
    }

    pub fn current_week(&self) -> u32 {
        self.data.week_number(self.clock.today())
    }

    pub fn resolve_week(&self, week: WeekSpec) -> u32 {
        match week {
            WeekSpec::Number(n) => n,
            WeekSpec::Current => self.current_week(),
        }
    }

    // ----- daily tasks -----

    pub fn add_daily_task(&mut self, input: NewDailyTask) -> Result<DailyTask, ServiceError> {
        let date = self.resolve_date(&input.date)?;
        let start = parse_hhmm(&input.start_time)?;
        let end = parse_hhmm(&input.end_time)?;

        let task = DailyTask::new(input.name, date, start, end)?
            .with_description(input.description)
            .with_flags(input.can_reschedule, input.can_compress, input.can_parallel)
            .with_parent(input.parent_task);

        if let Some(existing) = self
            .data
            .daily_schedules
            .get(&date)
            .and_then(|day| day.conflict_for(&task, None))
        {
            warn!("Rejected '{}' on {}: conflicts with '{}'", task.name, date, existing.name);
            return Err(ServiceError::Conflict {
                name: task.name.clone(),
                with: existing.name.clone(),
            });
        }

        self.data.day_mut(date).insert(task.clone());
        info!("Added daily task '{}' on {} ({} - {})", task.name, date, input.start_time, input.end_time);
        self.persist()?;
        Ok(task)
    }

    /// Apply a patch; the patched task is validated in full before anything
    /// is written
    pub fn update_daily_task(&mut self, id: DailyTaskId, patch: DailyTaskPatch) -> Result<DailyTask, ServiceError> {
        let current = self.daily_task(id)?.clone();
        let old_date = current.date;

        let mut candidate = current;
        if let Some(name) = patch.name {
            validate_name(&name)?;
            candidate.name = name.trim().to_string();
        }
        if let Some(date) = patch.date {
            candidate.date = self.resolve_date(&date)?;
        }
        if let Some(start) = patch.start_time {
            candidate.start_time = parse_hhmm(&start)?;
        }
        if let Some(end) = patch.end_time {
            candidate.end_time = parse_hhmm(&end)?;
        }
        DailyTask::validate_times(candidate.date, candidate.start_time, candidate.end_time)?;
        if let Some(description) = patch.description {
            candidate.description = description;
        }
        if let Some(flag) = patch.can_reschedule {
            candidate.can_reschedule = flag;
        }
        if let Some(flag) = patch.can_compress {
            candidate.can_compress = flag;
        }
        if let Some(flag) = patch.can_parallel {
            candidate.can_parallel = flag;
        }
        if let Some(parent) = patch.parent_task {
            candidate.parent_task = parent;
        }

        if let Some(existing) = self
            .data
            .daily_schedules
            .get(&candidate.date)
            .and_then(|day| day.conflict_for(&candidate, Some(id)))
        {
            warn!("Rejected update of '{}': conflicts with '{}'", candidate.name, existing.name);
            return Err(ServiceError::Conflict {
                name: candidate.name.clone(),
                with: existing.name.clone(),
            });
        }

        if candidate.date == old_date {
            let day = self.data.day_mut(old_date);
            if let Some(task) = day.task_mut(id) {
                *task = candidate.clone();
            }
            day.sort();
        } else {
            self.data.day_mut(old_date).remove(id);
            self.data.prune_day(old_date);
            self.data.day_mut(candidate.date).insert(candidate.clone());
            info!("Moved '{}' from {} to {}", candidate.name, old_date, candidate.date);
        }

        info!("Updated daily task '{}' ({})", candidate.name, id);
        self.persist()?;
        Ok(candidate)
    }

    pub fn remove_daily_task(&mut self, id: DailyTaskId) -> Result<DailyTask, ServiceError> {
        let date = self.data.locate_daily_task(id).ok_or_else(|| {
            warn!("Daily task not found: {}", id);
            ServiceError::NotFound {
                what: format!("daily task {}", id),
            }
        })?;

        let removed = self.data.day_mut(date).remove(id).ok_or_else(|| ServiceError::NotFound {
            what: format!("daily task {}", id),
        })?;
        self.data.prune_day(date);

        info!("Removed daily task '{}' from {}", removed.name, date);
        self.persist()?;
        Ok(removed)
    }

    pub fn daily_task(&self, id: DailyTaskId) -> Result<&DailyTask, ServiceError> {
        self.data.daily_task(id).ok_or_else(|| {
            warn!("Daily task not found: {}", id);
            ServiceError::NotFound {
                what: format!("daily task {}", id),
            }
        })
    }

    /// Look a task up by name; fails when the name is missing or not unique
    pub fn find_daily_task_by_name(&self, date_term: &str, name: &str) -> Result<&DailyTask, ServiceError> {
        let date = self.resolve_date(date_term)?;
        let matches = self
            .data
            .daily_schedules
            .get(&date)
            .map(|day| day.tasks_named(name.trim()))
            .unwrap_or_default();

        match matches.as_slice() {
            [] => Err(ServiceError::NotFound {
                what: format!("daily task '{}' on {}", name, date),
            }),
            [task] => Ok(*task),
            many => {
                warn!("Ambiguous name '{}' on {}: {} matches", name, date, many.len());
                Err(ServiceError::Ambiguous {
                    name: name.to_string(),
                    count: many.len(),
                })
            }
        }
    }

    pub fn remove_daily_task_by_name(&mut self, date_term: &str, name: &str) -> Result<DailyTask, ServiceError> {
        let id = self.find_daily_task_by_name(date_term, name)?.id;
        self.remove_daily_task(id)
    }

    // ----- weekly tasks -----

    pub fn add_weekly_task(&mut self, input: NewWeeklyTask) -> Result<WeeklyTask, ServiceError> {
        let week = self.resolve_week(input.week);
        let task = WeeklyTask::new(input.name, week, input.priority)?
            .with_description(input.description)
            .with_parent_project(input.parent_project);

        self.data.week_mut(week)?.insert(task.clone());
        info!("Added weekly task '{}' to week {} ({})", task.name, week, task.priority);
        self.persist()?;
        Ok(task)
    }

    pub fn update_weekly_task(&mut self, id: WeeklyTaskId, patch: WeeklyTaskPatch) -> Result<WeeklyTask, ServiceError> {
        let mut candidate = self.weekly_task(id)?.clone();
        let old_week = candidate.week;

        if let Some(name) = patch.name {
            validate_name(&name)?;
            candidate.name = name.trim().to_string();
        }
        if let Some(week) = patch.week {
            candidate.week = self.resolve_week(week);
            WeeklyTask::validate_week(candidate.week)?;
        }
        if let Some(description) = patch.description {
            candidate.description = description;
        }
        if let Some(parent) = patch.parent_project {
            candidate.parent_project = parent;
        }
        if let Some(priority) = patch.priority {
            candidate.priority = priority;
        }

        if candidate.week == old_week {
            let week = self.data.week_mut(old_week)?;
            if let Some(task) = week.task_mut(id) {
                *task = candidate.clone();
            }
            week.sort();
        } else {
            self.data.week_mut(candidate.week)?.insert(candidate.clone());
            self.data.week_mut(old_week)?.remove(id);
            info!("Moved '{}' from week {} to week {}", candidate.name, old_week, candidate.week);
        }

        info!("Updated weekly task '{}' ({})", candidate.name, id);
        self.persist()?;
        Ok(candidate)
    }

    pub fn remove_weekly_task(&mut self, id: WeeklyTaskId) -> Result<WeeklyTask, ServiceError> {
        let not_found = || ServiceError::NotFound {
            what: format!("weekly task {}", id),
        };
        let week = self.data.locate_weekly_task(id).ok_or_else(|| {
            warn!("Weekly task not found: {}", id);
            not_found()
        })?;
        let removed = self.data.week_mut(week)?.remove(id).ok_or_else(not_found)?;

        info!("Removed weekly task '{}' from week {}", removed.name, week);
        self.persist()?;
        Ok(removed)
    }

    pub fn weekly_task(&self, id: WeeklyTaskId) -> Result<&WeeklyTask, ServiceError> {
        self.data.weekly_task(id).ok_or_else(|| {
            warn!("Weekly task not found: {}", id);
            ServiceError::NotFound {
                what: format!("weekly task {}", id),
            }
        })
    }

    pub fn find_weekly_task_by_name(&self, week: WeekSpec, name: &str) -> Result<&WeeklyTask, ServiceError> {
        let number = self.resolve_week(week);
        let matches = self
            .data
            .weekly_schedules
            .get(&number)
            .map(|week| week.tasks_named(name.trim()))
            .unwrap_or_default();

        match matches.as_slice() {
            [] => Err(ServiceError::NotFound {
                what: format!("weekly task '{}' in week {}", name, number),
            }),
            [task] => Ok(*task),
            many => {
                warn!("Ambiguous name '{}' in week {}: {} matches", name, number, many.len());
                Err(ServiceError::Ambiguous {
                    name: name.to_string(),
                    count: many.len(),
                })
            }
        }
    }

    pub fn remove_weekly_task_by_name(&mut self, week: WeekSpec, name: &str) -> Result<WeeklyTask, ServiceError> {
        let id = self.find_weekly_task_by_name(week, name)?.id;
        self.remove_weekly_task(id)
    }

    // ----- queries -----

    /// Tasks of one day; an empty schedule when the day has none
    pub fn daily_schedule(&self, date_term: &str) -> Result<DailySchedule, ServiceError> {
        let date = self.resolve_date(date_term)?;
        Ok(self
            .data
            .daily_schedules
            .get(&date)
            .cloned()
            .unwrap_or_else(|| DailySchedule::new(date, self.week_number(date))))
    }

    /// Tasks of one week; an empty schedule when the week has none
    pub fn weekly_schedule(&self, week: WeekSpec) -> Result<WeeklySchedule, ServiceError> {
        let number = self.resolve_week(week);
        WeeklyTask::validate_week(number)?;
        match self.data.weekly_schedules.get(&number) {
            Some(schedule) => Ok(schedule.clone()),
            None => Ok(WeeklySchedule::new(
                number,
                crate::domain::time_utils::week_date_range_label(self.data.start_date, number)?,
            )),
        }
    }

    /// Existing day containers between two dates, inclusive
    pub fn date_range_schedules(&self, start_term: &str, end_term: &str) -> Result<Vec<&DailySchedule>, ServiceError> {
        let start = self.resolve_date(start_term)?;
        let end = self.resolve_date(end_term)?;
        if end < start {
            return Err(DomainError::Validation {
                message: format!("range end {} is before start {}", end, start),
            }
            .into());
        }
        Ok(self.data.daily_schedules.range(start..=end).map(|(_, day)| day).collect())
    }

    pub fn find_free_slots(
        &self,
        date_term: &str,
        duration_minutes: i64,
        window: Option<TimeWindow>,
    ) -> Result<Vec<FreeSlot>, ServiceError> {
        let date = self.resolve_date(date_term)?;
        let tasks: &[DailyTask] = self
            .data
            .daily_schedules
            .get(&date)
            .map(|day| day.tasks.as_slice())
            .unwrap_or(&[]);

        let duration = task_duration(duration_minutes)?;
        let slots = find_free_slots(date, tasks, duration, window.unwrap_or_default())?;
        debug!("Found {} free slots of {} minutes on {}", slots.len(), duration_minutes, date);
        Ok(slots)
    }

    /// Post-hoc conflict audit of one day
    pub fn detect_conflicts(&self, date_term: &str) -> Result<Vec<(&DailyTask, &DailyTask)>, ServiceError> {
        let date = self.resolve_date(date_term)?;
        let conflicts = self
            .data
            .daily_schedules
            .get(&date)
            .map(|day| day.conflicts())
            .unwrap_or_default();
        if !conflicts.is_empty() {
            warn!("{} conflicting pairs on {}", conflicts.len(), date);
        }
        Ok(conflicts)
    }

    pub fn statistics(&self) -> Statistics {
        let weekly_by_priority = WeeklyPriority::ALL
            .iter()
            .map(|priority| {
                let count = self
                    .data
                    .weekly_schedules
                    .values()
                    .map(|week| week.count_by_priority(*priority))
                    .sum::<usize>();
                (priority.as_str(), count)
            })
            .collect();

        Statistics {
            start_date: self.data.start_date,
            current_week: self.current_week(),
            total_days: self.data.daily_schedules.len(),
            total_weeks: self.data.weekly_schedules.len(),
            total_daily_tasks: self.data.daily_task_count(),
            total_weekly_tasks: self.data.weekly_task_count(),
            weekly_by_priority,
            total_scheduled_minutes: self.data.daily_schedules.values().map(DailySchedule::scheduled_minutes).sum(),
        }
    }

    /// Pretty-printed snapshot document
    pub fn export_json(&self) -> Result<String, ServiceError> {
        Ok(crate::storage::encode_snapshot(&self.data)?)
    }

    fn persist(&self) -> Result<(), ServiceError> {
        match self.store.save(&self.data) {
            Ok(()) => {
                debug!("Persisted schedule data to {}", self.store.describe());
                Ok(())
            }
            Err(e) => {
                error!("Failed to persist schedule data to {}: {}", self.store.describe(), e);
                Err(ServiceError::Persistence(e))
            }
        }
    }
}
