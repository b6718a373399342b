/// Core types and enums used throughout the domain layer
///
/// This module defines identifiers, task categories and the two priority
/// scales (one for time slots, one for weekly tasks) together with their
/// explicit rank tables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainError;

/// Unique identifier for a time slot
///
/// This is a wrapper around UUID to provide type safety - you can't accidentally
/// pass a slot ID where a daily task ID is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub Uuid);

/// Unique identifier for a day-scoped task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DailyTaskId(pub Uuid);

/// Unique identifier for a week-scoped task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeeklyTaskId(pub Uuid);

/// Unique identifier for a multi-week schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthScheduleId(pub Uuid);

macro_rules! uuid_id {
    ($name:ident) => {
        impl $name {
            /// Generate a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse an ID from its string form (useful for tool arguments)
            pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s.trim())?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(SlotId);
uuid_id!(DailyTaskId);
uuid_id!(WeeklyTaskId);
uuid_id!(MonthScheduleId);

/// Whether the planner may move a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Time is fixed, the planner never relocates it on its own
    Fixed,
    /// Can be shifted, compressed or dropped by the planner
    Flexible,
}

impl TaskType {
    /// Sort weight used by weekly planning (fixed first)
    pub fn weight(self) -> u8 {
        match self {
            TaskType::Fixed => 0,
            TaskType::Flexible => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Fixed => "fixed",
            TaskType::Flexible => "flexible",
        }
    }
}

impl FromStr for TaskType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(TaskType::Fixed),
            "flexible" => Ok(TaskType::Flexible),
            other => Err(DomainError::Validation {
                message: format!("Invalid task type '{}'. Valid options: fixed, flexible", other),
            }),
        }
    }
}

/// Priority of a time slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Position in scheduling order; 0 is scheduled first
    pub fn rank(self) -> u8 {
        match self {
            Priority::Urgent => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    /// True when `self` should win over `other` in a conflict
    pub fn outranks(self, other: Priority) -> bool {
        self.rank() < other.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(DomainError::InvalidPriority(format!(
                "'{}'. Valid options: low, medium, high, urgent", other
            ))),
        }
    }
}

/// Priority of a week-scoped task
///
/// Weekly tasks use their own scale, topping out at `Critical` instead of
/// `Urgent`. Weekly task lists are kept sorted by `rank()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WeeklyPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl WeeklyPriority {
    pub const ALL: [WeeklyPriority; 4] = [
        WeeklyPriority::Critical,
        WeeklyPriority::High,
        WeeklyPriority::Medium,
        WeeklyPriority::Low,
    ];

    /// Sort position: critical(0) < high(1) < medium(2) < low(3)
    pub fn rank(self) -> u8 {
        match self {
            WeeklyPriority::Critical => 0,
            WeeklyPriority::High => 1,
            WeeklyPriority::Medium => 2,
            WeeklyPriority::Low => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WeeklyPriority::Low => "low",
            WeeklyPriority::Medium => "medium",
            WeeklyPriority::High => "high",
            WeeklyPriority::Critical => "critical",
        }
    }
}

impl Default for WeeklyPriority {
    fn default() -> Self {
        WeeklyPriority::Medium
    }
}

impl FromStr for WeeklyPriority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(WeeklyPriority::Low),
            "medium" => Ok(WeeklyPriority::Medium),
            "high" => Ok(WeeklyPriority::High),
            "critical" => Ok(WeeklyPriority::Critical),
            other => Err(DomainError::InvalidPriority(format!(
                "'{}'. Valid options: low, medium, high, critical", other
            ))),
        }
    }
}

impl fmt::Display for WeeklyPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
