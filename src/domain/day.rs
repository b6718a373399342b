/// Day schedule container
///
/// Owns the time slots of one calendar date, keeps them sorted by start
/// time and maintains the total-duration and free-time statistics.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::conflict::{detect_conflicts, find_conflict, RejectReason};
use crate::domain::free_slots::free_periods;
use crate::domain::{SlotId, TimeSlot};

/// Default bounds used for container statistics
pub const DAY_START: (u32, u32) = (6, 0);
pub const DAY_END: (u32, u32) = (23, 0);

fn hm(hour_minute: (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(hour_minute.0, hour_minute.1, 0).unwrap_or(NaiveTime::MIN)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySchedule {
    date: NaiveDate,
    slots: Vec<TimeSlot>,
    /// Sum of slot durations, minutes
    total_duration: i64,
    /// Sum of free periods within 06:00-23:00, minutes
    free_time: i64,
}

impl DaySchedule {
    pub fn new(date: NaiveDate) -> Self {
        let mut day = Self {
            date,
            slots: Vec::new(),
            total_duration: 0,
            free_time: 0,
        };
        day.recompute();
        day
    }

    /// Rebuild a day from stored slots without conflict checks
    pub fn from_existing(date: NaiveDate, slots: Vec<TimeSlot>) -> Self {
        let mut day = Self {
            date,
            slots,
            total_duration: 0,
            free_time: 0,
        };
        day.recompute();
        day
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Slots in ascending start order
    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    pub fn slot(&self, id: SlotId) -> Option<&TimeSlot> {
        self.slots.iter().find(|slot| slot.id == id)
    }

    pub fn total_duration(&self) -> i64 {
        self.total_duration
    }

    pub fn free_time(&self) -> i64 {
        self.free_time
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn completed_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_completed).count()
    }

    /// Check whether `slot` could be added, without mutating
    pub fn check_slot(&self, slot: &TimeSlot) -> Result<(), RejectReason> {
        if slot.date() != self.date {
            return Err(RejectReason::WrongDate {
                expected: self.date,
                found: slot.date(),
            });
        }
        if let Some(existing) = find_conflict(&self.slots, slot) {
            return Err(RejectReason::Conflict {
                with: existing.title.clone(),
            });
        }
        Ok(())
    }

    /// Add a slot; a rejected slot leaves the day untouched
    pub fn add_slot(&mut self, slot: TimeSlot) -> Result<(), RejectReason> {
        self.check_slot(&slot)?;
        self.slots.push(slot);
        self.recompute();
        Ok(())
    }

    pub fn remove_slot(&mut self, id: SlotId) -> Option<TimeSlot> {
        let index = self.slots.iter().position(|slot| slot.id == id)?;
        let removed = self.slots.remove(index);
        self.recompute();
        Some(removed)
    }

    /// Mutable access to a slot; statistics are refreshed by `refresh`
    pub fn slot_mut(&mut self, id: SlotId) -> Option<&mut TimeSlot> {
        self.slots.iter_mut().find(|slot| slot.id == id)
    }

    /// Re-sort and recompute statistics after in-place edits
    pub fn refresh(&mut self) {
        self.recompute();
    }

    /// Free periods within the default 06:00-23:00 bounds
    pub fn free_periods(&self) -> Vec<(NaiveDateTime, NaiveDateTime)> {
        self.free_periods_within(hm(DAY_START), hm(DAY_END))
    }

    /// Free periods within caller-supplied bounds
    pub fn free_periods_within(&self, start: NaiveTime, end: NaiveTime) -> Vec<(NaiveDateTime, NaiveDateTime)> {
        free_periods(
            self.slots.iter().map(|slot| (slot.start_time, slot.end_time)),
            self.date.and_time(start),
            self.date.and_time(end),
        )
    }

    /// Longest free period within the given bounds, in minutes
    pub fn largest_gap_within(&self, start: NaiveTime, end: NaiveTime) -> i64 {
        self.free_periods_within(start, end)
            .iter()
            .map(|(from, to)| (*to - *from).num_minutes())
            .max()
            .unwrap_or(0)
    }

    pub fn conflicts(&self) -> Vec<(&TimeSlot, &TimeSlot)> {
        detect_conflicts(&self.slots)
    }

    fn recompute(&mut self) {
        self.slots.sort_by_key(|slot| slot.start_time);
        self.total_duration = self.slots.iter().map(TimeSlot::duration_minutes).sum();
        self.free_time = self
            .free_periods()
            .iter()
            .map(|(from, to)| (*to - *from).num_minutes())
            .sum();
    }
}
