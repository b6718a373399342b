/// Public library interface for the Time Planner MCP server
///
/// This module exports the scheduling core, the storage backends and the
/// server that exposes them as MCP tools over stdin/stdout.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use thiserror::Error;

pub mod domain;
pub mod mcp;
pub mod planning;
pub mod schedule;
pub mod service;
pub mod storage;
pub mod tools;

pub use domain::*;
pub use planning::{PlanningService, UnplacedReason, UnplacedTask};
pub use schedule::{ScheduleService, SlotStore};
pub use service::{ServiceError, TimeManagementService};
pub use storage::{JsonFileStore, MemoryStore, SnapshotStore, SqliteStore, StorageError};

/// Errors that can occur during server operation
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Domain validation error: {0}")]
    Domain(#[from] DomainError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Snapshot backend selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
}

impl StorageBackend {
    /// File name used when no data file is given
    pub fn default_file_name(self) -> &'static str {
        match self {
            StorageBackend::Json => "time_management_data.json",
            StorageBackend::Sqlite => "time_management_data.db",
        }
    }

    /// Open the store at `path`
    ///
    /// A database file SQLite cannot use is renamed out of the way and a
    /// fresh one is created in its place, so the server still starts.
    pub fn open(self, path: &Path) -> Result<Box<dyn SnapshotStore>, StorageError> {
        let store: Box<dyn SnapshotStore> = match self {
            StorageBackend::Json => Box::new(JsonFileStore::new(path)),
            StorageBackend::Sqlite => match SqliteStore::new(path) {
                Ok(store) => Box::new(store),
                Err(e) if path.exists() => {
                    let aside = set_aside(path)?;
                    tracing::warn!(
                        "Unusable database {} ({}), moved to {}; starting fresh",
                        path.display(),
                        e,
                        aside.display()
                    );
                    Box::new(SqliteStore::new(path)?)
                }
                Err(e) => return Err(e),
            },
        };
        Ok(store)
    }
}

/// Rename `path` to `<name>.unreadable-<timestamp>` beside it
fn set_aside(path: &Path) -> Result<PathBuf, StorageError> {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".unreadable-{}", chrono::Local::now().format("%Y%m%d%H%M%S")));
    let aside = path.with_file_name(name);
    std::fs::rename(path, &aside)?;
    Ok(aside)
}

/// Everything needed to start a server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub data_file: PathBuf,
    pub backend: StorageBackend,
    /// JSON preferences file; defaults apply when `None`
    pub preferences_file: Option<PathBuf>,
    /// Epoch for a fresh data set
    pub epoch: Option<chrono::NaiveDate>,
}

/// Load and validate a preferences file
pub fn load_preferences(path: &Path) -> Result<UserPreferences, ServerError> {
    let text = std::fs::read_to_string(path)?;
    let preferences: UserPreferences = serde_json::from_str(&text)?;
    preferences.validate()?;
    Ok(preferences)
}

/// Time planner that implements the MCP protocol
///
/// Owns the coarse scheduling service, the planner and the user's
/// preferences. Generic over the clock so tests can freeze time.
pub struct TimePlannerServer<C: Clock = SystemClock> {
    service: TimeManagementService<Box<dyn SnapshotStore>, C>,
    planner: PlanningService,
    preferences: UserPreferences,
}

impl TimePlannerServer<SystemClock> {
    /// Open the configured store and load preferences
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        tracing::info!(
            "Initializing Time Planner server with {:?} store at {}",
            config.backend,
            config.data_file.display()
        );

        let store = config.backend.open(&config.data_file)?;
        let preferences = match &config.preferences_file {
            Some(path) => load_preferences(path)?,
            None => UserPreferences::default(),
        };

        let service = TimeManagementService::open(store, SystemClock, config.epoch);
        Ok(Self::from_parts(service, preferences))
    }
}

impl<C: Clock> TimePlannerServer<C> {
    pub fn from_parts(service: TimeManagementService<Box<dyn SnapshotStore>, C>, preferences: UserPreferences) -> Self {
        Self {
            service,
            planner: PlanningService::new(),
            preferences,
        }
    }

    /// Run the MCP server, handling JSON-RPC requests over stdin/stdout
    ///
    /// Returns when stdin is closed.
    pub async fn run(self) -> Result<(), ServerError> {
        let stats = self.service.statistics();
        tracing::info!(
            "Server started with {} daily and {} weekly tasks",
            stats.total_daily_tasks,
            stats.total_weekly_tasks
        );

        let mut mcp_server = mcp::McpServer::new(self);
        mcp_server.run().await?;

        Ok(())
    }

    pub fn service(&self) -> &TimeManagementService<Box<dyn SnapshotStore>, C> {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut TimeManagementService<Box<dyn SnapshotStore>, C> {
        &mut self.service
    }

    pub fn planner(&self) -> &PlanningService {
        &self.planner
    }

    pub fn preferences(&self) -> &UserPreferences {
        &self.preferences
    }

    /// Split borrow for tools that plan and then write back
    pub fn parts_mut(
        &mut self,
    ) -> (
        &mut TimeManagementService<Box<dyn SnapshotStore>, C>,
        &PlanningService,
        &UserPreferences,
    ) {
        (&mut self.service, &self.planner, &self.preferences)
    }
}
