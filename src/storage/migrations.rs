/// SQLite schema for `SqliteStore`
///
/// Migrations are an ordered list of SQL batches. Each one is applied once
/// and the schema version is bumped right after it, so an interrupted
/// upgrade resumes where it stopped.

use rusqlite::{params, Connection};
use tracing::info;

use crate::storage::StorageError;

/// (version, SQL) in ascending version order
const MIGRATIONS: &[(i32, &str)] = &[(
    1,
    "CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS weeks (
        week_number INTEGER PRIMARY KEY,
        date_range TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS daily_tasks (
        id TEXT PRIMARY KEY,
        date TEXT NOT NULL,
        name TEXT NOT NULL,
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        can_reschedule BOOLEAN NOT NULL DEFAULT TRUE,
        can_compress BOOLEAN NOT NULL DEFAULT TRUE,
        can_parallel BOOLEAN NOT NULL DEFAULT FALSE,
        parent_task TEXT
    );

    CREATE TABLE IF NOT EXISTS weekly_tasks (
        id TEXT PRIMARY KEY,
        week_number INTEGER NOT NULL,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        parent_project TEXT,
        priority TEXT NOT NULL,
        position INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_daily_tasks_date ON daily_tasks (date, start_time);
    CREATE INDEX IF NOT EXISTS idx_weekly_tasks_week ON weekly_tasks (week_number, position);",
)];

/// Newest schema version this build knows
pub(crate) fn latest_version() -> i32 {
    MIGRATIONS.last().map_or(0, |(version, _)| *version)
}

/// Bring the schema up to date; a no-op on a current database
pub fn initialize_database(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")?;

    let found = schema_version(conn)?;
    let latest = latest_version();
    if found > latest {
        return Err(StorageError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            found, latest
        )));
    }

    for (version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > found) {
        conn.execute_batch(sql)
            .map_err(|e| StorageError::Migration(format!("migration v{} failed: {}", version, e)))?;
        conn.execute("DELETE FROM schema_version", [])?;
        conn.execute("INSERT INTO schema_version (version) VALUES (?1)", params![version])?;
        info!("Applied schema migration v{}", version);
    }

    Ok(())
}

/// Recorded schema version, 0 for a fresh database
pub(crate) fn schema_version(conn: &Connection) -> Result<i32, StorageError> {
    let version: Option<i32> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0))
}
