/// Tools for week-scoped tasks
///
/// Weeks are counted from the epoch date. Every tool accepts either a week
/// number or "current"; omitting the week means the current one.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::{Clock, WeeklyPriority, WeeklySchedule, WeeklyTask, WeeklyTaskId};
use crate::service::{NewWeeklyTask, ServiceError, TimeManagementService, WeeklyTaskPatch};
use crate::storage::SnapshotStore;
use crate::tools::{invalid, parse_id, week_or_current, WeekArg};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddWeeklyTaskParams {
    pub name: String,
    /// Week number (1 = the epoch week) or "current" (default)
    pub week: Option<WeekArg>,
    pub description: Option<String>,
    pub parent_project: Option<String>,
    /// critical, high, medium (default) or low
    pub priority: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WeeklyTaskResponse {
    pub success: bool,
    pub message: String,
    pub task: WeeklyTask,
}

fn parse_priority(raw: Option<&str>) -> Result<Option<WeeklyPriority>, ServiceError> {
    raw.map(|p| p.parse::<WeeklyPriority>().map_err(ServiceError::from))
        .transpose()
}

pub fn add_weekly_task<S: SnapshotStore, C: Clock>(
    service: &mut TimeManagementService<S, C>,
    params: AddWeeklyTaskParams,
) -> Result<WeeklyTaskResponse, ServiceError> {
    let week = week_or_current(params.week.as_ref())?;
    let priority = parse_priority(params.priority.as_deref())?.unwrap_or_default();

    let mut input = NewWeeklyTask::new(params.name, week, priority);
    if let Some(description) = params.description {
        input = input.description(description);
    }
    if let Some(project) = params.parent_project {
        input = input.parent_project(project);
    }

    let task = service.add_weekly_task(input)?;
    Ok(WeeklyTaskResponse {
        success: true,
        message: format!("Added '{}' to week {} with {} priority", task.name, task.week, task.priority),
        task,
    })
}

/// How a tool call points at an existing weekly task
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct WeeklyTaskRef {
    pub task_id: Option<String>,
    /// Task name, used when no id is given
    pub task_name: Option<String>,
    /// Week of the named task (default current)
    pub week: Option<WeekArg>,
}

impl WeeklyTaskRef {
    fn resolve<S: SnapshotStore, C: Clock>(
        &self,
        service: &TimeManagementService<S, C>,
    ) -> Result<WeeklyTaskId, ServiceError> {
        if let Some(raw) = &self.task_id {
            return parse_id(raw, WeeklyTaskId::from_string);
        }
        match &self.task_name {
            Some(name) => {
                let week = week_or_current(self.week.as_ref())?;
                Ok(service.find_weekly_task_by_name(week, name)?.id)
            }
            None => Err(invalid("Either task_id or task_name is required")),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateWeeklyTaskParams {
    #[serde(flatten)]
    pub target: WeeklyTaskRef,
    pub new_name: Option<String>,
    /// Moves the task to another week
    pub new_week: Option<WeekArg>,
    pub description: Option<String>,
    /// New parent project; an empty string clears it
    pub parent_project: Option<String>,
    pub priority: Option<String>,
}

pub fn update_weekly_task<S: SnapshotStore, C: Clock>(
    service: &mut TimeManagementService<S, C>,
    params: UpdateWeeklyTaskParams,
) -> Result<WeeklyTaskResponse, ServiceError> {
    let id = params.target.resolve(service)?;
    let patch = WeeklyTaskPatch {
        name: params.new_name,
        week: params.new_week.as_ref().map(WeekArg::to_spec).transpose()?,
        description: params.description,
        parent_project: params
            .parent_project
            .map(|project| Some(project).filter(|p| !p.trim().is_empty())),
        priority: parse_priority(params.priority.as_deref())?,
    };
    if patch == WeeklyTaskPatch::default() {
        return Err(invalid("Nothing to update"));
    }

    let task = service.update_weekly_task(id, patch)?;
    Ok(WeeklyTaskResponse {
        success: true,
        message: format!("Updated '{}' in week {}", task.name, task.week),
        task,
    })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RemoveWeeklyTaskParams {
    #[serde(flatten)]
    pub target: WeeklyTaskRef,
}

pub fn remove_weekly_task<S: SnapshotStore, C: Clock>(
    service: &mut TimeManagementService<S, C>,
    params: RemoveWeeklyTaskParams,
) -> Result<WeeklyTaskResponse, ServiceError> {
    let id = params.target.resolve(service)?;
    let task = service.remove_weekly_task(id)?;
    Ok(WeeklyTaskResponse {
        success: true,
        message: format!("Removed '{}' from week {}", task.name, task.week),
        task,
    })
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetWeeklyScheduleParams {
    /// Week number or "current" (default)
    pub week: Option<WeekArg>,
}

#[derive(Debug, Serialize)]
pub struct WeeklyScheduleResponse {
    pub success: bool,
    pub message: String,
    pub schedule: WeeklySchedule,
}

pub fn get_weekly_schedule<S: SnapshotStore, C: Clock>(
    service: &TimeManagementService<S, C>,
    params: GetWeeklyScheduleParams,
) -> Result<WeeklyScheduleResponse, ServiceError> {
    let week = week_or_current(params.week.as_ref())?;
    let schedule = service.weekly_schedule(week)?;

    Ok(WeeklyScheduleResponse {
        success: true,
        message: format!(
            "Week {} ({}): {} tasks",
            schedule.week_number,
            schedule.date_range,
            schedule.tasks.len()
        ),
        schedule,
    })
}
