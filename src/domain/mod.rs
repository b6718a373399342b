/// Domain module containing the scheduling entities and pure algorithms
///
/// This module defines the core entities (TimeSlot, DaySchedule, DailyTask,
/// WeeklyTask, ...) together with their validation rules, the date/time
/// calculus, conflict detection and free-time search. Nothing in here
/// touches the filesystem or the clock directly.

pub mod types;
pub mod time_utils;
pub mod conflict;
pub mod free_slots;
pub mod slot;
pub mod day;
pub mod week;
pub mod daily;
pub mod weekly;
pub mod preferences;
pub mod data;

// Re-export public types for easy access
pub use types::*;
pub use time_utils::{Clock, DayPart, FixedClock, SystemClock};
pub use conflict::*;
pub use free_slots::*;
pub use slot::*;
pub use day::*;
pub use week::*;
pub use daily::*;
pub use weekly::*;
pub use preferences::*;
pub use data::*;

use chrono::NaiveDateTime;
use thiserror::Error;

/// Errors that can occur during domain operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid time range: end {end} must be after start {start}")]
    InvalidTimeRange { start: NaiveDateTime, end: NaiveDateTime },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid priority: {0}")]
    InvalidPriority(String),

    #[error("Invalid task name: {0}")]
    InvalidTaskName(String),

    #[error("Weekday index must be 0-6, got {0}")]
    InvalidWeekday(usize),

    #[error("Invalid preferences: {0}")]
    InvalidPreferences(String),
}

/// Validate a task or slot name according to business rules
pub(crate) fn validate_name(name: &str) -> Result<(), DomainError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(DomainError::InvalidTaskName(
            "Task name cannot be empty".to_string()
        ));
    }

    if trimmed.chars().count() > 200 {
        return Err(DomainError::InvalidTaskName(
            "Task name cannot be longer than 200 characters".to_string()
        ));
    }

    Ok(())
}
