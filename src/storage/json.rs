/// JSON file implementation of the snapshot store
///
/// The whole aggregate is one pretty-printed JSON document. Saves go to a
/// temporary sibling first, so a crash mid-write never truncates the file.

use std::path::{Path, PathBuf};

use crate::domain::TimeManagementData;
use crate::storage::{decode_snapshot, encode_snapshot, write_atomic, SnapshotStore, StorageError};

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<TimeManagementData>, StorageError> {
        if !self.path.exists() {
            tracing::debug!("No snapshot at {}", self.path.display());
            return Ok(None);
        }

        let text = std::fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(None);
        }

        let data = decode_snapshot(&text)?;
        tracing::debug!(
            "Loaded snapshot from {}: {} days, {} weeks",
            self.path.display(),
            data.daily_schedules.len(),
            data.weekly_schedules.len()
        );
        Ok(Some(data))
    }

    fn save(&self, data: &TimeManagementData) -> Result<(), StorageError> {
        let text = encode_snapshot(data)?;
        write_atomic(&self.path, &text)?;
        tracing::debug!("Wrote snapshot to {}", self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}
