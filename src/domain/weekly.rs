/// Week-scoped tasks of the coarse model
///
/// Weekly tasks have no clock times, only a week number counted from the
/// epoch date. A week's task list is kept sorted by priority rank.

use serde::{Deserialize, Serialize};

use crate::domain::time_utils::MAX_WEEK_NUMBER;
use crate::domain::{validate_name, DomainError, WeeklyPriority, WeeklyTaskId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyTask {
    #[serde(default)]
    pub id: WeeklyTaskId,
    #[serde(alias = "task_name")]
    pub name: String,
    #[serde(alias = "belong_to_week")]
    pub week: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent_project: Option<String>,
    #[serde(default)]
    pub priority: WeeklyPriority,
}

impl WeeklyTask {
    pub fn new(name: impl Into<String>, week: u32, priority: WeeklyPriority) -> Result<Self, DomainError> {
        let name = name.into();
        validate_name(&name)?;
        Self::validate_week(week)?;

        Ok(Self {
            id: WeeklyTaskId::new(),
            name: name.trim().to_string(),
            week,
            description: String::new(),
            parent_project: None,
            priority,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parent_project(mut self, parent_project: Option<String>) -> Self {
        self.parent_project = parent_project;
        self
    }

    pub(crate) fn validate_week(week: u32) -> Result<(), DomainError> {
        if week == 0 {
            return Err(DomainError::Validation {
                message: "Week numbers start at 1".to_string(),
            });
        }
        if week > MAX_WEEK_NUMBER {
            return Err(DomainError::Validation {
                message: format!("Week {} is past the last supported week {}", week, MAX_WEEK_NUMBER),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub week_number: u32,
    /// "YYYY-MM-DD - YYYY-MM-DD"
    pub date_range: String,
    #[serde(default)]
    pub tasks: Vec<WeeklyTask>,
}

impl WeeklySchedule {
    pub fn new(week_number: u32, date_range: impl Into<String>) -> Self {
        Self {
            week_number,
            date_range: date_range.into(),
            tasks: Vec::new(),
        }
    }

    /// Insert and re-sort by priority rank
    pub fn insert(&mut self, task: WeeklyTask) {
        self.tasks.push(task);
        self.sort();
    }

    pub fn remove(&mut self, id: WeeklyTaskId) -> Option<WeeklyTask> {
        let index = self.tasks.iter().position(|task| task.id == id)?;
        Some(self.tasks.remove(index))
    }

    pub fn task(&self, id: WeeklyTaskId) -> Option<&WeeklyTask> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn task_mut(&mut self, id: WeeklyTaskId) -> Option<&mut WeeklyTask> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    pub fn tasks_named(&self, name: &str) -> Vec<&WeeklyTask> {
        self.tasks.iter().filter(|task| task.name == name).collect()
    }

    /// Stable, so equal priorities keep insertion order
    pub fn sort(&mut self) {
        self.tasks.sort_by_key(|task| task.priority.rank());
    }

    pub fn count_by_priority(&self, priority: WeeklyPriority) -> usize {
        self.tasks.iter().filter(|task| task.priority == priority).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_sorts_by_rank() {
        let mut week = WeeklySchedule::new(1, "2025-07-01 - 2025-07-07");
        for (name, priority) in [
            ("a", WeeklyPriority::Low),
            ("b", WeeklyPriority::High),
            ("c", WeeklyPriority::Critical),
            ("d", WeeklyPriority::Medium),
        ] {
            week.insert(WeeklyTask::new(name, 1, priority).unwrap());
        }

        let order: Vec<_> = week.tasks.iter().map(|t| t.priority).collect();
        assert_eq!(order, WeeklyPriority::ALL.to_vec());
    }

    #[test]
    fn test_equal_priorities_keep_insertion_order() {
        let mut week = WeeklySchedule::new(2, "");
        week.insert(WeeklyTask::new("first", 2, WeeklyPriority::High).unwrap());
        week.insert(WeeklyTask::new("urgent", 2, WeeklyPriority::Critical).unwrap());
        week.insert(WeeklyTask::new("second", 2, WeeklyPriority::High).unwrap());

        let names: Vec<_> = week.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["urgent", "first", "second"]);
    }

    #[test]
    fn test_week_bounds() {
        assert!(WeeklyTask::new("Study", 0, WeeklyPriority::Low).is_err());
        assert!(WeeklyTask::new("Study", MAX_WEEK_NUMBER, WeeklyPriority::Low).is_ok());
        assert!(WeeklyTask::new("Study", MAX_WEEK_NUMBER + 1, WeeklyPriority::Low).is_err());
    }

    #[test]
    fn test_reads_legacy_record() {
        let json = r#"{"task_name": "Read book", "belong_to_week": 2, "priority": "critical"}"#;
        let task: WeeklyTask = serde_json::from_str(json).unwrap();
        assert_eq!(task.week, 2);
        assert_eq!(task.priority, WeeklyPriority::Critical);
        assert!(task.description.is_empty());
    }
}
