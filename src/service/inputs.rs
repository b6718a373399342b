/// Structured inputs accepted by the time management service
///
/// Dates are kept as strings here because callers may pass relative terms
/// ("today", "tomorrow") that only the service can resolve against its clock.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::time_utils::MAX_WEEK_NUMBER;
use crate::domain::{DomainError, WeeklyPriority};

/// A daily task as supplied by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct NewDailyTask {
    pub name: String,
    /// "YYYY-MM-DD" or a relative term
    pub date: String,
    /// "HH:MM"
    pub start_time: String,
    pub end_time: String,
    pub description: String,
    pub can_reschedule: bool,
    pub can_compress: bool,
    pub can_parallel: bool,
    pub parent_task: Option<String>,
}

impl NewDailyTask {
    pub fn new(
        name: impl Into<String>,
        date: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            date: date.into(),
            start_time: start_time.into(),
            end_time: end_time.into(),
            description: String::new(),
            can_reschedule: true,
            can_compress: true,
            can_parallel: false,
            parent_task: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn fixed(mut self) -> Self {
        self.can_reschedule = false;
        self
    }

    pub fn parallel(mut self, can_parallel: bool) -> Self {
        self.can_parallel = can_parallel;
        self
    }

    pub fn compressible(mut self, can_compress: bool) -> Self {
        self.can_compress = can_compress;
        self
    }

    pub fn parent(mut self, parent_task: impl Into<String>) -> Self {
        self.parent_task = Some(parent_task.into());
        self
    }
}

/// Field-level update of a daily task; `None` leaves the field alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyTaskPatch {
    pub name: Option<String>,
    /// Moving to another date moves the task to that day's container
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub description: Option<String>,
    pub can_reschedule: Option<bool>,
    pub can_compress: Option<bool>,
    pub can_parallel: Option<bool>,
    pub parent_task: Option<Option<String>>,
}

impl DailyTaskPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Which epoch-relative week a weekly task belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeekSpec {
    Number(u32),
    /// The week containing the clock's today
    Current,
}

impl FromStr for WeekSpec {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "current" | "this_week" | "this week" | "本周" => Ok(WeekSpec::Current),
            other => other
                .parse::<u32>()
                .ok()
                .filter(|n| (1..=MAX_WEEK_NUMBER).contains(n))
                .map(WeekSpec::Number)
                .ok_or_else(|| DomainError::Validation {
                    message: format!("Invalid week '{}'. Use a week number (1, 2, ...) or 'current'", trimmed),
                }),
        }
    }
}

impl fmt::Display for WeekSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeekSpec::Number(n) => write!(f, "week {}", n),
            WeekSpec::Current => f.write_str("current week"),
        }
    }
}

impl From<u32> for WeekSpec {
    fn from(n: u32) -> Self {
        WeekSpec::Number(n)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewWeeklyTask {
    pub name: String,
    pub week: WeekSpec,
    pub description: String,
    pub parent_project: Option<String>,
    pub priority: WeeklyPriority,
}

impl NewWeeklyTask {
    pub fn new(name: impl Into<String>, week: impl Into<WeekSpec>, priority: WeeklyPriority) -> Self {
        Self {
            name: name.into(),
            week: week.into(),
            description: String::new(),
            parent_project: None,
            priority,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn parent_project(mut self, parent_project: impl Into<String>) -> Self {
        self.parent_project = Some(parent_project.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeeklyTaskPatch {
    pub name: Option<String>,
    /// Moving to another week moves the task to that week's container
    pub week: Option<WeekSpec>,
    pub description: Option<String>,
    pub parent_project: Option<Option<String>>,
    pub priority: Option<WeeklyPriority>,
}
