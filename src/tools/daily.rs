/// Tools for day-scoped tasks
///
/// Adding, editing and removing daily tasks, plus the day and date-range
/// schedule queries. Tasks are addressed by id; a name plus date works as a
/// shortcut when the name is unique on that day.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::{Clock, DailySchedule, DailyTask, DailyTaskId};
use crate::service::{DailyTaskPatch, NewDailyTask, ServiceError, TimeManagementService};
use crate::storage::SnapshotStore;
use crate::tools::{invalid, parse_id};

/// Parameters for adding a daily task
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddDailyTaskParams {
    /// Task name
    pub name: String,
    /// "YYYY-MM-DD" or a relative term such as "today" or "tomorrow"
    pub date: String,
    /// Start time, "HH:MM"
    pub start_time: String,
    /// End time, "HH:MM"; must be after the start
    pub end_time: String,
    pub description: Option<String>,
    /// Whether the task may be moved (default true)
    pub can_reschedule: Option<bool>,
    /// Whether the task may be shortened (default true)
    pub can_compress: Option<bool>,
    /// Whether the task may share time with other parallel tasks (default false)
    pub can_parallel: Option<bool>,
    /// Name of the larger task this one belongs to
    pub parent_task: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DailyTaskResponse {
    pub success: bool,
    pub message: String,
    pub task: DailyTask,
}

pub fn add_daily_task<S: SnapshotStore, C: Clock>(
    service: &mut TimeManagementService<S, C>,
    params: AddDailyTaskParams,
) -> Result<DailyTaskResponse, ServiceError> {
    let mut input = NewDailyTask::new(params.name, params.date, params.start_time, params.end_time);
    if let Some(description) = params.description {
        input = input.description(description);
    }
    if let Some(flag) = params.can_reschedule {
        input.can_reschedule = flag;
    }
    if let Some(flag) = params.can_compress {
        input.can_compress = flag;
    }
    if let Some(flag) = params.can_parallel {
        input = input.parallel(flag);
    }
    if let Some(parent) = params.parent_task {
        input = input.parent(parent);
    }

    let task = service.add_daily_task(input)?;
    Ok(DailyTaskResponse {
        success: true,
        message: format!(
            "Added '{}' on {} from {} to {}",
            task.name,
            task.date,
            task.start_time.format("%H:%M"),
            task.end_time.format("%H:%M")
        ),
        task,
    })
}

/// How a tool call points at an existing daily task
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct DailyTaskRef {
    /// Task id as returned by add_daily_task
    pub task_id: Option<String>,
    /// Task name, used when no id is given
    pub task_name: Option<String>,
    /// Date of the named task (default "today")
    pub date: Option<String>,
}

impl DailyTaskRef {
    fn resolve<S: SnapshotStore, C: Clock>(
        &self,
        service: &TimeManagementService<S, C>,
    ) -> Result<DailyTaskId, ServiceError> {
        if let Some(raw) = &self.task_id {
            return parse_id(raw, DailyTaskId::from_string);
        }
        match &self.task_name {
            Some(name) => {
                let date = self.date.as_deref().unwrap_or("today");
                Ok(service.find_daily_task_by_name(date, name)?.id)
            }
            None => Err(invalid("Either task_id or task_name is required")),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateDailyTaskParams {
    #[serde(flatten)]
    pub target: DailyTaskRef,
    pub new_name: Option<String>,
    /// Moves the task to another day
    pub new_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub description: Option<String>,
    pub can_reschedule: Option<bool>,
    pub can_compress: Option<bool>,
    pub can_parallel: Option<bool>,
    /// New parent task; an empty string clears it
    pub parent_task: Option<String>,
}

pub fn update_daily_task<S: SnapshotStore, C: Clock>(
    service: &mut TimeManagementService<S, C>,
    params: UpdateDailyTaskParams,
) -> Result<DailyTaskResponse, ServiceError> {
    let id = params.target.resolve(service)?;
    let patch = DailyTaskPatch {
        name: params.new_name,
        date: params.new_date,
        start_time: params.start_time,
        end_time: params.end_time,
        description: params.description,
        can_reschedule: params.can_reschedule,
        can_compress: params.can_compress,
        can_parallel: params.can_parallel,
        parent_task: params
            .parent_task
            .map(|parent| Some(parent).filter(|p| !p.trim().is_empty())),
    };
    if patch.is_empty() {
        return Err(invalid("Nothing to update"));
    }

    let task = service.update_daily_task(id, patch)?;
    Ok(DailyTaskResponse {
        success: true,
        message: format!("Updated '{}' on {}", task.name, task.date),
        task,
    })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RemoveDailyTaskParams {
    #[serde(flatten)]
    pub target: DailyTaskRef,
}

pub fn remove_daily_task<S: SnapshotStore, C: Clock>(
    service: &mut TimeManagementService<S, C>,
    params: RemoveDailyTaskParams,
) -> Result<DailyTaskResponse, ServiceError> {
    let id = params.target.resolve(service)?;
    let task = service.remove_daily_task(id)?;
    Ok(DailyTaskResponse {
        success: true,
        message: format!("Removed '{}' from {}", task.name, task.date),
        task,
    })
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetDailyScheduleParams {
    /// "YYYY-MM-DD" or a relative term (default "today")
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DailyScheduleResponse {
    pub success: bool,
    pub message: String,
    pub schedule: DailySchedule,
    pub total_minutes: i64,
}

pub fn get_daily_schedule<S: SnapshotStore, C: Clock>(
    service: &TimeManagementService<S, C>,
    params: GetDailyScheduleParams,
) -> Result<DailyScheduleResponse, ServiceError> {
    let schedule = service.daily_schedule(params.date.as_deref().unwrap_or("today"))?;
    let message = if schedule.tasks.is_empty() {
        format!("Nothing scheduled on {}", schedule.date)
    } else {
        format!("{} tasks on {} (week {})", schedule.tasks.len(), schedule.date, schedule.week_number)
    };

    Ok(DailyScheduleResponse {
        success: true,
        message,
        total_minutes: schedule.scheduled_minutes(),
        schedule,
    })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetDateRangeSchedulesParams {
    pub start_date: String,
    /// Inclusive end of the range
    pub end_date: String,
}

#[derive(Debug, Serialize)]
pub struct DateRangeSchedulesResponse {
    pub success: bool,
    pub message: String,
    /// Only days that have tasks
    pub schedules: Vec<DailySchedule>,
}

pub fn get_date_range_schedules<S: SnapshotStore, C: Clock>(
    service: &TimeManagementService<S, C>,
    params: GetDateRangeSchedulesParams,
) -> Result<DateRangeSchedulesResponse, ServiceError> {
    let schedules: Vec<DailySchedule> = service
        .date_range_schedules(&params.start_date, &params.end_date)?
        .into_iter()
        .cloned()
        .collect();
    let tasks: usize = schedules.iter().map(|day| day.tasks.len()).sum();

    Ok(DateRangeSchedulesResponse {
        success: true,
        message: format!("{} tasks across {} days", tasks, schedules.len()),
        schedules,
    })
}
