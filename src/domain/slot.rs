/// TimeSlot entity and related functionality
///
/// A time slot is the fine-grained, timestamp-based unit of scheduled work.
/// It is owned by the day schedule it is placed into.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::conflict::Scheduled;
use crate::domain::{validate_name, DomainError, Priority, SlotId, TaskType};

/// A titled, time-bounded block of work on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Unique identifier for this slot
    pub id: SlotId,
    pub title: String,
    pub description: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub task_type: TaskType,
    pub priority: Priority,
    /// Whether this slot may share time with another parallel-capable slot
    pub can_parallel: bool,
    /// Parent slot when this one is a decomposed sub-task
    pub parent_id: Option<SlotId>,
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    /// Progress ratio in [0, 1]
    #[serde(default)]
    pub completion_rate: f64,
}

/// Parameters for creating a time slot
#[derive(Debug, Clone, PartialEq)]
pub struct NewTimeSlot {
    pub title: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub description: Option<String>,
    pub task_type: TaskType,
    pub priority: Priority,
    pub can_parallel: bool,
    pub parent_id: Option<SlotId>,
    pub location: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
}

impl NewTimeSlot {
    /// Flexible, medium priority, not parallel
    pub fn new(title: impl Into<String>, start_time: NaiveDateTime, end_time: NaiveDateTime) -> Self {
        Self {
            title: title.into(),
            start_time,
            end_time,
            description: None,
            task_type: TaskType::Flexible,
            priority: Priority::Medium,
            can_parallel: false,
            parent_id: None,
            location: None,
            tags: Vec::new(),
            notes: None,
        }
    }

    pub fn task_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn parallel(mut self, can_parallel: bool) -> Self {
        self.can_parallel = can_parallel;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn parent(mut self, parent_id: SlotId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Field-level update for a time slot; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub task_type: Option<TaskType>,
    pub priority: Option<Priority>,
    pub can_parallel: Option<bool>,
    pub location: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<Option<String>>,
    pub completion_rate: Option<f64>,
}

impl TimeSlot {
    /// Create a new slot with validation
    pub fn new(params: NewTimeSlot) -> Result<Self, DomainError> {
        validate_name(&params.title)?;
        Self::validate_range(params.start_time, params.end_time)?;

        Ok(Self {
            id: SlotId::new(),
            title: params.title.trim().to_string(),
            description: params.description,
            start_time: params.start_time,
            end_time: params.end_time,
            task_type: params.task_type,
            priority: params.priority,
            can_parallel: params.can_parallel,
            parent_id: params.parent_id,
            location: params.location,
            tags: params.tags,
            notes: params.notes,
            is_completed: false,
            completion_rate: 0.0,
        })
    }

    /// Duration in whole minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }

    /// Calendar date the slot starts on
    pub fn date(&self) -> NaiveDate {
        self.start_time.date()
    }

    /// Move the slot to `new_start`, keeping its duration
    pub fn relocate(&mut self, new_start: NaiveDateTime) {
        let duration = self.duration();
        self.start_time = new_start;
        self.end_time = new_start + duration;
    }

    /// Apply a patch; nothing is written unless the patched slot is valid
    pub fn update(&mut self, patch: SlotPatch) -> Result<(), DomainError> {
        if let Some(ref title) = patch.title {
            validate_name(title)?;
        }
        let start = patch.start_time.unwrap_or(self.start_time);
        let end = patch.end_time.unwrap_or(self.end_time);
        Self::validate_range(start, end)?;
        if let Some(rate) = patch.completion_rate {
            Self::validate_rate(rate)?;
        }

        if let Some(title) = patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        self.start_time = start;
        self.end_time = end;
        if let Some(task_type) = patch.task_type {
            self.task_type = task_type;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(can_parallel) = patch.can_parallel {
            self.can_parallel = can_parallel;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(rate) = patch.completion_rate {
            self.apply_rate(rate);
        }

        Ok(())
    }

    /// Record partial progress; a rate of 1.0 completes the slot
    pub fn set_progress(&mut self, rate: f64) -> Result<(), DomainError> {
        Self::validate_rate(rate)?;
        self.apply_rate(rate);
        Ok(())
    }

    pub fn mark_completed(&mut self) {
        self.apply_rate(1.0);
    }

    fn apply_rate(&mut self, rate: f64) {
        self.completion_rate = rate;
        self.is_completed = rate >= 1.0;
    }

    fn validate_range(start: NaiveDateTime, end: NaiveDateTime) -> Result<(), DomainError> {
        if end <= start {
            return Err(DomainError::InvalidTimeRange { start, end });
        }
        Ok(())
    }

    fn validate_rate(rate: f64) -> Result<(), DomainError> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(DomainError::Validation {
                message: format!("Completion rate must be between 0 and 1, got {}", rate),
            });
        }
        Ok(())
    }
}

impl Scheduled for TimeSlot {
    fn span(&self) -> (NaiveDateTime, NaiveDateTime) {
        (self.start_time, self.end_time)
    }

    fn allows_parallel(&self) -> bool {
        self.can_parallel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, 16).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_slot_requires_end_after_start() {
        assert!(TimeSlot::new(NewTimeSlot::new("Focus", at(10, 0), at(10, 0))).is_err());
        assert!(TimeSlot::new(NewTimeSlot::new("Focus", at(11, 0), at(10, 0))).is_err());

        let slot = TimeSlot::new(NewTimeSlot::new("Focus", at(10, 0), at(10, 1))).unwrap();
        assert_eq!(slot.duration_minutes(), 1);
        assert!(!slot.is_completed);
    }

    #[test]
    fn test_slot_requires_title() {
        let err = TimeSlot::new(NewTimeSlot::new("  ", at(10, 0), at(11, 0))).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTaskName(_)));
    }

    #[test]
    fn test_relocate_keeps_duration() {
        let mut slot = TimeSlot::new(NewTimeSlot::new("Gym", at(7, 0), at(8, 30))).unwrap();
        slot.relocate(at(18, 0));
        assert_eq!(slot.start_time, at(18, 0));
        assert_eq!(slot.end_time, at(19, 30));
    }

    #[test]
    fn test_update_is_all_or_nothing() {
        let mut slot = TimeSlot::new(NewTimeSlot::new("Read", at(20, 0), at(21, 0))).unwrap();
        let before = slot.clone();

        let bad = SlotPatch {
            title: Some("Read more".to_string()),
            end_time: Some(at(19, 0)),
            ..Default::default()
        };
        assert!(slot.update(bad).is_err());
        assert_eq!(slot, before);

        let good = SlotPatch {
            priority: Some(Priority::High),
            end_time: Some(at(22, 0)),
            ..Default::default()
        };
        slot.update(good).unwrap();
        assert_eq!(slot.priority, Priority::High);
        assert_eq!(slot.duration_minutes(), 120);
    }

    #[test]
    fn test_progress() {
        let mut slot = TimeSlot::new(NewTimeSlot::new("Write", at(9, 0), at(10, 0))).unwrap();
        slot.set_progress(0.5).unwrap();
        assert!(!slot.is_completed);
        assert!(slot.set_progress(1.5).is_err());
        assert_eq!(slot.completion_rate, 0.5);
        slot.mark_completed();
        assert!(slot.is_completed);
    }
}
