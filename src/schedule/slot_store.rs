/// Time slot store
///
/// Keyed map of every time slot the fine-grained model knows about, with
/// optional write-through persistence to a JSON file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::domain::{
    detect_conflicts, find_free_slots, FreeSlot, NewTimeSlot, SlotId, SlotPatch, TimeSlot, TimeWindow,
};
use crate::service::ServiceError;
use crate::storage::{write_atomic, StorageError};

/// On-disk layout of the slot file
#[derive(Debug, Serialize, Deserialize)]
struct SlotFile {
    #[serde(default = "one")]
    version: u32,
    slots: Vec<TimeSlot>,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Default)]
pub struct SlotStore {
    slots: BTreeMap<SlotId, TimeSlot>,
    path: Option<PathBuf>,
}

impl SlotStore {
    /// Store without persistence
    pub fn new() -> Self {
        Self::default()
    }

    /// Store backed by a JSON file, loading it when present
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let mut slots = BTreeMap::new();

        if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            if !text.trim().is_empty() {
                let file: SlotFile = serde_json::from_str(&text)?;
                for slot in file.slots {
                    slots.insert(slot.id, slot);
                }
            }
            info!("Loaded {} time slots from {}", slots.len(), path.display());
        }

        Ok(Self {
            slots,
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn create_slot(&mut self, params: NewTimeSlot) -> Result<TimeSlot, ServiceError> {
        let slot = TimeSlot::new(params)?;
        self.slots.insert(slot.id, slot.clone());
        info!("Created time slot: {} ({} - {})", slot.title, slot.start_time, slot.end_time);
        self.persist()?;
        Ok(slot)
    }

    pub fn get_slot(&self, id: SlotId) -> Option<&TimeSlot> {
        self.slots.get(&id)
    }

    /// Apply a patch; the slot is validated as a whole before anything changes
    pub fn update_slot(&mut self, id: SlotId, patch: SlotPatch) -> Result<TimeSlot, ServiceError> {
        let Some(slot) = self.slots.get_mut(&id) else {
            warn!("Time slot not found: {}", id);
            return Err(ServiceError::NotFound {
                what: format!("time slot {}", id),
            });
        };

        slot.update(patch)?;
        let updated = slot.clone();
        info!("Updated time slot: {}", updated.title);
        self.persist()?;
        Ok(updated)
    }

    pub fn delete_slot(&mut self, id: SlotId) -> Result<TimeSlot, ServiceError> {
        let removed = self.slots.remove(&id).ok_or_else(|| ServiceError::NotFound {
            what: format!("time slot {}", id),
        })?;
        info!("Deleted time slot: {}", removed.title);
        self.persist()?;
        Ok(removed)
    }

    /// Slots starting on a date within `[start, end]`, ordered by start time
    pub fn find_slots_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<&TimeSlot> {
        let mut found: Vec<&TimeSlot> = self
            .slots
            .values()
            .filter(|slot| (start..=end).contains(&slot.date()))
            .collect();
        found.sort_by_key(|slot| slot.start_time);
        found
    }

    /// Pairwise conflict audit over an arbitrary slot list
    pub fn detect_conflicts<'a>(&self, slots: &'a [TimeSlot]) -> Vec<(&'a TimeSlot, &'a TimeSlot)> {
        let conflicts = detect_conflicts(slots);
        info!("Detected {} time conflicts", conflicts.len());
        conflicts
    }

    /// Free windows on `date` among the stored slots
    pub fn find_free_slots(
        &self,
        date: NaiveDate,
        duration: Duration,
        window: TimeWindow,
    ) -> Result<Vec<FreeSlot>, ServiceError> {
        let day: Vec<TimeSlot> = self
            .find_slots_by_date_range(date, date)
            .into_iter()
            .cloned()
            .collect();
        Ok(find_free_slots(date, &day, duration, window)?)
    }

    fn persist(&self) -> Result<(), ServiceError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let file = SlotFile {
            version: 1,
            slots: self.slots.values().cloned().collect(),
        };
        let result = serde_json::to_string_pretty(&file)
            .map_err(StorageError::from)
            .and_then(|text| write_atomic(path, &text));

        match result {
            Ok(()) => {
                debug!("Saved {} time slots to {}", self.slots.len(), path.display());
                Ok(())
            }
            Err(e) => {
                error!("Failed to save time slots to {}: {}", path.display(), e);
                Err(ServiceError::Persistence(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use tempfile::tempdir;

    fn at(day: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, day).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn test_crud_cycle() {
        let mut store = SlotStore::new();
        let slot = store.create_slot(NewTimeSlot::new("Deep work", at(16, 9), at(16, 11))).unwrap();
        assert_eq!(store.len(), 1);

        let updated = store
            .update_slot(slot.id, SlotPatch { title: Some("Deeper work".to_string()), ..Default::default() })
            .unwrap();
        assert_eq!(updated.title, "Deeper work");

        let bad = store.update_slot(slot.id, SlotPatch { end_time: Some(at(16, 8)), ..Default::default() });
        assert!(matches!(bad, Err(ServiceError::Domain(_))));
        assert_eq!(store.get_slot(slot.id).unwrap().end_time, at(16, 11));

        store.delete_slot(slot.id).unwrap();
        assert!(matches!(store.delete_slot(slot.id), Err(ServiceError::NotFound { .. })));
    }

    #[test]
    fn test_date_range_query_is_sorted() {
        let mut store = SlotStore::new();
        store.create_slot(NewTimeSlot::new("Later", at(17, 15), at(17, 16))).unwrap();
        store.create_slot(NewTimeSlot::new("Earlier", at(16, 9), at(16, 10))).unwrap();
        store.create_slot(NewTimeSlot::new("Outside", at(20, 9), at(20, 10))).unwrap();

        let found = store.find_slots_by_date_range(
            NaiveDate::from_ymd_opt(2025, 7, 16).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 17).unwrap(),
        );
        let titles: Vec<_> = found.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Earlier", "Later"]);
    }

    #[test]
    fn test_free_slots_among_stored() {
        let mut store = SlotStore::new();
        store.create_slot(NewTimeSlot::new("Busy", at(16, 10), at(16, 11))).unwrap();
        let free = store
            .find_free_slots(NaiveDate::from_ymd_opt(2025, 7, 16).unwrap(), Duration::minutes(30), TimeWindow::default())
            .unwrap();
        assert_eq!(free[0].start, at(16, 9));
        assert_eq!(free[1].start, at(16, 11));
    }

    #[test]
    fn test_persists_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("slots.json");

        let id = {
            let mut store = SlotStore::open(&path).unwrap();
            store.create_slot(NewTimeSlot::new("Gym", at(16, 7), at(16, 8))).unwrap().id
        };

        let store = SlotStore::open(&path).unwrap();
        assert_eq!(store.get_slot(id).unwrap().title, "Gym");
    }
}
