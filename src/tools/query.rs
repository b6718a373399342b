/// Read-only analysis tools: free-time search, conflict audit, statistics

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::time_utils::parse_hhmm;
use crate::domain::{Clock, DailyTask, FreeSlot, TimeWindow};
use crate::service::{ServiceError, Statistics, TimeManagementService};
use crate::storage::SnapshotStore;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindFreeTimeSlotsParams {
    /// "YYYY-MM-DD" or a relative term (default "today")
    pub date: Option<String>,
    /// Length of the slot wanted, in minutes
    pub duration_minutes: i64,
    /// Earliest acceptable start, "HH:MM" (default 09:00)
    pub preferred_start: Option<String>,
    /// Latest acceptable end, "HH:MM" (default 22:00)
    pub preferred_end: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FreeTimeSlotsResponse {
    pub success: bool,
    pub message: String,
    pub slots: Vec<FreeSlot>,
}

pub fn find_free_time_slots<S: SnapshotStore, C: Clock>(
    service: &TimeManagementService<S, C>,
    params: FindFreeTimeSlotsParams,
) -> Result<FreeTimeSlotsResponse, ServiceError> {
    let defaults = TimeWindow::default();
    let start = params.preferred_start.as_deref().map(parse_hhmm).transpose()?;
    let end = params.preferred_end.as_deref().map(parse_hhmm).transpose()?;
    let window = TimeWindow::new(start.unwrap_or(defaults.start), end.unwrap_or(defaults.end))?;

    let date = params.date.as_deref().unwrap_or("today");
    let slots = service.find_free_slots(date, params.duration_minutes, Some(window))?;

    let message = match slots.first() {
        None => format!("No free {}-minute slot between {} and {}", params.duration_minutes, window.start, window.end),
        Some(first) => format!(
            "{} free {}-minute slots, earliest at {}",
            slots.len(),
            params.duration_minutes,
            first.start.format("%H:%M")
        ),
    };

    Ok(FreeTimeSlotsResponse {
        success: true,
        message,
        slots,
    })
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct DetectConflictsParams {
    /// "YYYY-MM-DD" or a relative term (default "today")
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConflictPair {
    pub first: DailyTask,
    pub second: DailyTask,
}

#[derive(Debug, Serialize)]
pub struct ConflictsResponse {
    pub success: bool,
    pub message: String,
    pub conflicts: Vec<ConflictPair>,
}

pub fn detect_conflicts<S: SnapshotStore, C: Clock>(
    service: &TimeManagementService<S, C>,
    params: DetectConflictsParams,
) -> Result<ConflictsResponse, ServiceError> {
    let date = params.date.as_deref().unwrap_or("today");
    let conflicts: Vec<ConflictPair> = service
        .detect_conflicts(date)?
        .into_iter()
        .map(|(first, second)| ConflictPair {
            first: first.clone(),
            second: second.clone(),
        })
        .collect();

    let message = if conflicts.is_empty() {
        "No conflicts found".to_string()
    } else {
        conflicts
            .iter()
            .map(|pair| format!("'{}' overlaps '{}'", pair.first.name, pair.second.name))
            .collect::<Vec<_>>()
            .join("; ")
    };

    Ok(ConflictsResponse {
        success: true,
        message,
        conflicts,
    })
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetStatisticsParams {}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub success: bool,
    pub message: String,
    pub statistics: Statistics,
}

pub fn get_statistics<S: SnapshotStore, C: Clock>(
    service: &TimeManagementService<S, C>,
    _params: GetStatisticsParams,
) -> Result<StatisticsResponse, ServiceError> {
    let statistics = service.statistics();
    Ok(StatisticsResponse {
        success: true,
        message: format!(
            "{} daily tasks over {} days, {} weekly tasks over {} weeks (current week {})",
            statistics.total_daily_tasks,
            statistics.total_days,
            statistics.total_weekly_tasks,
            statistics.total_weeks,
            statistics.current_week
        ),
        statistics,
    })
}
