/// In-memory snapshot store for tests and ephemeral sessions

use std::cell::{Cell, RefCell};

use crate::domain::TimeManagementData;
use crate::storage::{SnapshotStore, StorageError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RefCell<Option<TimeManagementData>>,
    saves: Cell<usize>,
    fail_saves: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with an aggregate
    pub fn with_data(data: TimeManagementData) -> Self {
        let store = Self::default();
        store.data.replace(Some(data));
        store
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }

    /// Make every following save fail with an I/O error
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.set(fail);
    }

    pub fn stored(&self) -> Option<TimeManagementData> {
        self.data.borrow().clone()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<TimeManagementData>, StorageError> {
        Ok(self.data.borrow().clone())
    }

    fn save(&self, data: &TimeManagementData) -> Result<(), StorageError> {
        if self.fail_saves.get() {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "simulated write failure",
            )));
        }
        self.data.replace(Some(data.clone()));
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
