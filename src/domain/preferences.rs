/// User preferences for planning
///
/// Routine times, durations and toggles the planner reads. Preferences are
/// loaded once and never modified by the scheduling core. Every field has a
/// default so partial JSON files are accepted.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::domain::time_utils::{hhmm, MAX_TASK_MINUTES};
use crate::domain::DomainError;

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    #[serde(with = "hhmm")]
    pub wake_up_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub sleep_time: NaiveTime,

    #[serde(with = "hhmm")]
    pub breakfast_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub lunch_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub dinner_time: NaiveTime,
    /// Minutes per meal
    pub meal_duration: i64,

    #[serde(with = "hhmm")]
    pub productive_hours_start: NaiveTime,
    #[serde(with = "hhmm")]
    pub productive_hours_end: NaiveTime,

    /// Minutes
    pub max_continuous_work: i64,
    pub break_duration: i64,
    pub entertainment_duration: i64,
    pub exercise_duration: i64,

    /// Weekday indices, 0 = Monday
    pub preferred_work_days: Vec<u8>,

    /// Minutes kept free after each placed task
    pub buffer_time: i64,

    pub allow_parallel_tasks: bool,
    pub strict_schedule: bool,
    pub flexible_meal_time: bool,
    pub flexible_sleep_time: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            wake_up_time: hm(7, 0),
            sleep_time: hm(23, 0),
            breakfast_time: hm(8, 0),
            lunch_time: hm(12, 0),
            dinner_time: hm(18, 0),
            meal_duration: 45,
            productive_hours_start: hm(9, 0),
            productive_hours_end: hm(17, 0),
            max_continuous_work: 120,
            break_duration: 15,
            entertainment_duration: 60,
            exercise_duration: 30,
            preferred_work_days: vec![0, 1, 2, 3, 4],
            buffer_time: 10,
            allow_parallel_tasks: true,
            strict_schedule: false,
            flexible_meal_time: true,
            flexible_sleep_time: false,
        }
    }
}

impl UserPreferences {
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(1..=MAX_TASK_MINUTES).contains(&self.meal_duration) {
            return Err(DomainError::InvalidPreferences(format!(
                "meal_duration must be 1-{} minutes", MAX_TASK_MINUTES
            )));
        }
        if !(0..=MAX_TASK_MINUTES).contains(&self.buffer_time) {
            return Err(DomainError::InvalidPreferences(format!(
                "buffer_time must be 0-{} minutes", MAX_TASK_MINUTES
            )));
        }
        if let Some(day) = self.preferred_work_days.iter().find(|day| **day > 6) {
            return Err(DomainError::InvalidPreferences(format!(
                "preferred_work_days must be 0-6, got {}", day
            )));
        }
        if self.wake_up_time >= self.sleep_time {
            return Err(DomainError::InvalidPreferences(
                "wake_up_time must be before sleep_time".to_string(),
            ));
        }
        if self.productive_hours_start >= self.productive_hours_end {
            return Err(DomainError::InvalidPreferences(
                "productive_hours_start must be before productive_hours_end".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_work_day(&self, weekday: Weekday) -> bool {
        let index = weekday.num_days_from_monday() as u8;
        self.preferred_work_days.contains(&index)
    }

    /// Breakfast, lunch and dinner with their start times
    pub fn meals(&self) -> [(&'static str, NaiveTime); 3] {
        [
            ("Breakfast", self.breakfast_time),
            ("Lunch", self.lunch_time),
            ("Dinner", self.dinner_time),
        ]
    }

    pub fn is_productive(&self, time: NaiveTime) -> bool {
        time >= self.productive_hours_start && time < self.productive_hours_end
    }
}
