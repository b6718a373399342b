/// Fine-grained schedule management
///
/// Day, week and month containers over `TimeSlot`s. This is the model the
/// planner works on; the coarser day/week task model lives in `service`.

pub mod slot_store;

pub use slot_store::SlotStore;

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::domain::{
    DaySchedule, MonthSchedule, MonthScheduleId, RejectReason, SlotId, TimeSlot, WeekSchedule,
};

/// Owns the day, week and month containers of the fine-grained model
#[derive(Debug, Default)]
pub struct ScheduleService {
    slots: SlotStore,
    days: BTreeMap<NaiveDate, DaySchedule>,
    /// Keyed by (ISO year, ISO week)
    weeks: BTreeMap<(i32, u32), WeekSchedule>,
    months: HashMap<MonthScheduleId, MonthSchedule>,
}

impl ScheduleService {
    pub fn new(slots: SlotStore) -> Self {
        info!("Schedule service initialized");
        Self {
            slots,
            ..Default::default()
        }
    }

    pub fn slot_store(&self) -> &SlotStore {
        &self.slots
    }

    pub fn slot_store_mut(&mut self) -> &mut SlotStore {
        &mut self.slots
    }

    pub fn get_or_create_day(&mut self, date: NaiveDate) -> &mut DaySchedule {
        self.days.entry(date).or_insert_with(|| {
            info!("Created day schedule: {}", date);
            DaySchedule::new(date)
        })
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DaySchedule> {
        self.days.get(&date)
    }

    pub fn add_slot_to_day(&mut self, date: NaiveDate, slot: TimeSlot) -> Result<(), RejectReason> {
        let title = slot.title.clone();
        match self.get_or_create_day(date).add_slot(slot) {
            Ok(()) => {
                info!("Added '{}' to day schedule {}", title, date);
                Ok(())
            }
            Err(reason) => {
                warn!("Could not add '{}' to {}: {}", title, date, reason);
                Err(reason)
            }
        }
    }

    pub fn remove_slot_from_day(&mut self, date: NaiveDate, id: SlotId) -> Option<TimeSlot> {
        let removed = self.days.get_mut(&date)?.remove_slot(id)?;
        info!("Removed '{}' from day schedule {}", removed.title, date);
        Some(removed)
    }

    /// Create (or replace) the week starting at `monday`
    pub fn create_week_schedule(&mut self, monday: NaiveDate) -> &mut WeekSchedule {
        let week = WeekSchedule::starting(monday);
        let key = (week.year, week.week_number);
        info!("Created week schedule: week {} of {}, starting {}", key.1, key.0, monday);
        let entry = self.weeks.entry(key).or_insert_with(|| WeekSchedule::starting(monday));
        *entry = week;
        entry
    }

    pub fn week_schedule(&self, year: i32, week_number: u32) -> Option<&WeekSchedule> {
        self.weeks.get(&(year, week_number))
    }

    pub fn week_schedule_mut(&mut self, year: i32, week_number: u32) -> Option<&mut WeekSchedule> {
        self.weeks.get_mut(&(year, week_number))
    }

    pub fn create_month_schedule(&mut self, title: impl Into<String>, start_date: NaiveDate) -> &MonthSchedule {
        let month = MonthSchedule::new(title, start_date);
        let id = month.id;
        info!("Created month schedule: {}, starting {}", month.title, start_date);
        self.months.entry(id).or_insert(month)
    }

    pub fn month_schedule(&self, id: MonthScheduleId) -> Option<&MonthSchedule> {
        self.months.get(&id)
    }

    pub fn month_schedule_mut(&mut self, id: MonthScheduleId) -> Option<&mut MonthSchedule> {
        self.months.get_mut(&id)
    }

    /// Slots in day containers overlapping the half-open range `[start, end)`
    pub fn query_slots_by_range(&self, start: NaiveDateTime, end: NaiveDateTime) -> Vec<&TimeSlot> {
        if end <= start {
            return Vec::new();
        }
        let mut found: Vec<&TimeSlot> = self
            .days
            .range(start.date()..=end.date())
            .flat_map(|(_, day)| day.slots())
            .filter(|slot| slot.start_time < end && slot.end_time > start)
            .collect();
        found.sort_by_key(|slot| slot.start_time);
        info!("Range query {} - {} matched {} slots", start, end, found.len());
        found
    }
}

/// ISO (year, week) key of the week containing `date`
pub fn week_key(date: NaiveDate) -> (i32, u32) {
    let iso = date.iso_week();
    (iso.year(), iso.week())
}
