/// Storage layer for persisting the scheduling aggregate
///
/// The core never talks to a file or database directly. It goes through a
/// `SnapshotStore`, which loads the whole `TimeManagementData` at startup and
/// writes it back in full after every mutation. JSON files are the default
/// backend; SQLite and an in-memory store are also provided.

pub mod json;
pub mod memory;
pub mod migrations;
pub mod sqlite;

// Re-export the main storage types
pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{TimeManagementData, SNAPSHOT_VERSION};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Snapshot version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Persistence strategy for the aggregate
///
/// `load` returns `Ok(None)` when nothing has been stored yet.
pub trait SnapshotStore {
    fn load(&self) -> Result<Option<TimeManagementData>, StorageError>;

    fn save(&self, data: &TimeManagementData) -> Result<(), StorageError>;

    /// Where the snapshot lives, for log messages
    fn describe(&self) -> String;
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for Box<S> {
    fn load(&self) -> Result<Option<TimeManagementData>, StorageError> {
        (**self).load()
    }

    fn save(&self, data: &TimeManagementData) -> Result<(), StorageError> {
        (**self).save(data)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

#[derive(Deserialize)]
struct VersionProbe {
    #[serde(default)]
    version: Option<u32>,
}

/// Parse a JSON snapshot, accepting untagged legacy documents
pub fn decode_snapshot(text: &str) -> Result<TimeManagementData, StorageError> {
    let probe: VersionProbe = serde_json::from_str(text)?;
    if let Some(found) = probe.version {
        if found > SNAPSHOT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found,
                supported: SNAPSHOT_VERSION,
            });
        }
    }

    let mut data: TimeManagementData = serde_json::from_str(text)?;
    data.normalize();
    Ok(data)
}

pub fn encode_snapshot(data: &TimeManagementData) -> Result<String, StorageError> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// Write `contents` to a `.tmp` sibling and rename it over `path`
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp = tmp_path(path);
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
