/// Week and month containers for the fine-grained model
///
/// A week owns exactly seven day schedules, Monday first. A month schedule
/// is a loose sequence of weeks rather than a calendar month.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::conflict::RejectReason;
use crate::domain::time_utils::calculate_week_number;
use crate::domain::{DaySchedule, DomainError, MonthScheduleId, TimeSlot};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekSchedule {
    pub week_number: u32,
    pub year: i32,
    /// Monday of this week
    pub start_date: NaiveDate,
    days: Vec<DaySchedule>,
    total_tasks: usize,
    completed_tasks: usize,
}

impl WeekSchedule {
    pub fn new(week_number: u32, year: i32, start_date: NaiveDate) -> Self {
        let days = (0..7)
            .map(|offset| DaySchedule::new(start_date + Duration::days(offset)))
            .collect();

        Self {
            week_number,
            year,
            start_date,
            days,
            total_tasks: 0,
            completed_tasks: 0,
        }
    }

    /// Week starting at `monday`, numbered by ISO week
    pub fn starting(monday: NaiveDate) -> Self {
        let iso = monday.iso_week();
        Self::new(iso.week(), iso.year(), monday)
    }

    pub fn end_date(&self) -> NaiveDate {
        self.start_date + Duration::days(6)
    }

    pub fn days(&self) -> &[DaySchedule] {
        &self.days
    }

    /// Day by weekday index, 0 = Monday
    pub fn day(&self, weekday: usize) -> Result<&DaySchedule, DomainError> {
        self.days.get(weekday).ok_or(DomainError::InvalidWeekday(weekday))
    }

    pub fn day_mut(&mut self, weekday: usize) -> Result<&mut DaySchedule, DomainError> {
        self.days.get_mut(weekday).ok_or(DomainError::InvalidWeekday(weekday))
    }

    /// Day schedule for a calendar date inside this week
    pub fn day_for(&self, date: NaiveDate) -> Option<&DaySchedule> {
        self.days.iter().find(|day| day.date() == date)
    }

    pub fn add_slot_to_day(&mut self, weekday: usize, slot: TimeSlot) -> Result<(), RejectReason> {
        let day = self
            .days
            .get_mut(weekday)
            .ok_or(RejectReason::NoSuchDay(weekday))?;
        day.add_slot(slot)?;
        self.refresh_statistics();
        Ok(())
    }

    pub fn all_slots(&self) -> impl Iterator<Item = &TimeSlot> {
        self.days.iter().flat_map(|day| day.slots())
    }

    pub fn total_tasks(&self) -> usize {
        self.total_tasks
    }

    pub fn completed_tasks(&self) -> usize {
        self.completed_tasks
    }

    pub fn refresh_statistics(&mut self) {
        self.total_tasks = self.days.iter().map(DaySchedule::len).sum();
        self.completed_tasks = self.days.iter().map(DaySchedule::completed_count).sum();
    }
}

/// A named sequence of weeks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthSchedule {
    pub id: MonthScheduleId,
    pub title: String,
    pub start_date: NaiveDate,
    weeks: Vec<WeekSchedule>,
}

impl MonthSchedule {
    pub fn new(title: impl Into<String>, start_date: NaiveDate) -> Self {
        Self {
            id: MonthScheduleId::new(),
            title: title.into(),
            start_date,
            weeks: Vec::new(),
        }
    }

    pub fn add_week(&mut self, week: WeekSchedule) {
        self.weeks.push(week);
    }

    /// Append a week starting at `start`, numbered from this month's start date
    pub fn create_new_week(&mut self, start: NaiveDate) -> &WeekSchedule {
        let number = calculate_week_number(self.start_date, start);
        let index = self.weeks.len();
        self.weeks.push(WeekSchedule::new(number, start.year(), start));
        &self.weeks[index]
    }

    pub fn week(&self, index: usize) -> Option<&WeekSchedule> {
        self.weeks.get(index)
    }

    pub fn weeks(&self) -> &[WeekSchedule] {
        &self.weeks
    }

    pub fn total_weeks(&self) -> usize {
        self.weeks.len()
    }
}
