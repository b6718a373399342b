/// Day planning tool
///
/// Fits a batch of unscheduled tasks around what is already on the day,
/// seeding meals from the user's preferences. The plan is a proposal unless
/// `commit` is set, in which case placed tasks are stored as daily tasks.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::time_utils::{format_date, format_hhmm, task_duration, MAX_TASK_MINUTES};
use crate::domain::{
    Clock, DailyTask, DaySchedule, DomainError, NewTimeSlot, Priority, TaskType, TimeSlot, UserPreferences,
};
use crate::planning::{PlanningService, UnplacedReason};
use crate::schedule::{ScheduleService, SlotStore};
use crate::service::{NewDailyTask, ServiceError, TimeManagementService};
use crate::storage::SnapshotStore;
use crate::tools::invalid;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlanTaskParams {
    pub name: String,
    pub duration_minutes: i64,
    /// low, medium (default), high or urgent
    pub priority: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlanDayParams {
    /// "YYYY-MM-DD" or a relative term (default "today")
    pub date: Option<String>,
    /// Tasks to fit into the day, in any order
    pub tasks: Vec<PlanTaskParams>,
    /// Store placed tasks as daily tasks (default false)
    #[serde(default)]
    pub commit: bool,
}

#[derive(Debug, Serialize)]
pub struct PlannedEntry {
    pub title: String,
    pub start: String,
    pub end: String,
    pub task_type: TaskType,
    pub priority: Priority,
}

#[derive(Debug, Serialize)]
pub struct UnplacedEntry {
    pub name: String,
    pub duration_minutes: i64,
    pub reason: UnplacedReason,
}

#[derive(Debug, Serialize)]
pub struct PlanDayResponse {
    pub success: bool,
    pub message: String,
    pub date: String,
    /// The whole day after planning, existing tasks and meals included
    pub schedule: Vec<PlannedEntry>,
    pub placed: Vec<String>,
    pub unplaced: Vec<UnplacedEntry>,
    /// Daily tasks written when `commit` was set
    pub committed: Vec<DailyTask>,
}

pub fn plan_day<S: SnapshotStore, C: Clock>(
    service: &mut TimeManagementService<S, C>,
    planner: &PlanningService,
    preferences: &UserPreferences,
    params: PlanDayParams,
) -> Result<PlanDayResponse, ServiceError> {
    if params.tasks.is_empty() {
        return Err(invalid("No tasks to plan"));
    }
    let date = service.resolve_date(params.date.as_deref().unwrap_or("today"))?;

    let mut schedule = ScheduleService::new(SlotStore::new());
    *schedule.get_or_create_day(date) = existing_day(service, date)?;

    let start = date.and_time(preferences.wake_up_time);
    let slots = params
        .tasks
        .into_iter()
        .map(|task| {
            let priority = match task.priority.as_deref() {
                Some(raw) => raw.parse::<Priority>()?,
                None => Priority::default(),
            };
            let length = task_duration(task.duration_minutes).map_err(|_| DomainError::Validation {
                message: format!(
                    "Task '{}' lasts {} minutes; durations must be 1-{}",
                    task.name, task.duration_minutes, MAX_TASK_MINUTES
                ),
            })?;
            let mut slot = NewTimeSlot::new(task.name, start, start + length).priority(priority);
            if let Some(description) = task.description {
                slot = slot.description(description);
            }
            TimeSlot::new(slot)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let outcome = planner.generate_daily_plan(&mut schedule, date, slots, preferences);

    let placed: Vec<&TimeSlot> = outcome
        .placed
        .iter()
        .filter_map(|id| outcome.schedule.slot(*id))
        .collect();

    let mut committed = Vec::new();
    if params.commit {
        for slot in &placed {
            let mut input = NewDailyTask::new(
                slot.title.clone(),
                format_date(date),
                format_hhmm(slot.start_time.time()),
                format_hhmm(slot.end_time.time()),
            );
            if let Some(description) = &slot.description {
                input = input.description(description.clone());
            }
            committed.push(service.add_daily_task(input)?);
        }
        info!("Committed {} planned tasks on {}", committed.len(), date);
    }

    let message = format!(
        "Placed {} of {} tasks on {}{}",
        placed.len(),
        placed.len() + outcome.unplaced.len(),
        date,
        if params.commit { " and saved them" } else { "" }
    );

    Ok(PlanDayResponse {
        success: true,
        message,
        date: format_date(date),
        schedule: outcome.schedule.slots().iter().map(entry).collect(),
        placed: placed.iter().map(|slot| slot.title.clone()).collect(),
        unplaced: outcome
            .unplaced
            .iter()
            .map(|unplaced| UnplacedEntry {
                name: unplaced.task.title.clone(),
                duration_minutes: unplaced.task.duration_minutes(),
                reason: unplaced.reason,
            })
            .collect(),
        committed,
    })
}

/// The stored daily tasks of `date` as obstacles for the planner
fn existing_day<S: SnapshotStore, C: Clock>(
    service: &TimeManagementService<S, C>,
    date: NaiveDate,
) -> Result<DaySchedule, ServiceError> {
    let tasks = service.daily_schedule(&format_date(date))?.tasks;
    let slots = tasks
        .into_iter()
        .map(|task| {
            let task_type = if task.can_reschedule {
                TaskType::Flexible
            } else {
                TaskType::Fixed
            };
            TimeSlot::new(
                NewTimeSlot::new(task.name, date.and_time(task.start_time), date.and_time(task.end_time))
                    .task_type(task_type)
                    .parallel(task.can_parallel),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DaySchedule::from_existing(date, slots))
}

fn entry(slot: &TimeSlot) -> PlannedEntry {
    PlannedEntry {
        title: slot.title.clone(),
        start: format_hhmm(slot.start_time.time()),
        end: format_hhmm(slot.end_time.time()),
        task_type: slot.task_type,
        priority: slot.priority,
    }
}
