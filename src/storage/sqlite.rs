/// SQLite implementation of the snapshot store
///
/// Keeps the aggregate in relational tables but preserves full-rewrite
/// semantics: every save replaces all rows inside one transaction.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::time_utils::{format_date, format_hhmm, parse_date, parse_hhmm};
use crate::domain::{
    DailySchedule, DailyTask, DailyTaskId, TimeManagementData, WeeklySchedule, WeeklyTask, WeeklyTaskId,
    SNAPSHOT_VERSION,
};
use crate::storage::{migrations, SnapshotStore, StorageError};

/// SQLite-based snapshot store
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

/// Wrap a parse failure of column `index` as a rusqlite conversion error
fn conversion<E>(index: usize) -> impl FnOnce(E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    move |err| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

impl SqliteStore {
    /// Open (or create) the database file and migrate the schema
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = db_path.into();
        let conn = Connection::open(&path)
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;

        migrations::initialize_database(&conn)?;

        tracing::info!("SQLite storage initialized at: {:?}", path);
        Ok(Self { conn, path })
    }

    /// Database living only as long as this value
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("Failed to open in-memory database: {}", e)))?;
        migrations::initialize_database(&conn)?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn meta(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn daily_task_from_row(row: &Row<'_>) -> rusqlite::Result<DailyTask> {
        let id: String = row.get(0)?;
        let date: String = row.get(1)?;
        let start: String = row.get(3)?;
        let end: String = row.get(4)?;

        Ok(DailyTask {
            id: DailyTaskId::from_string(&id).map_err(conversion(0))?,
            date: parse_date(&date).map_err(conversion(1))?,
            name: row.get(2)?,
            start_time: parse_hhmm(&start).map_err(conversion(3))?,
            end_time: parse_hhmm(&end).map_err(conversion(4))?,
            description: row.get(5)?,
            can_reschedule: row.get(6)?,
            can_compress: row.get(7)?,
            can_parallel: row.get(8)?,
            parent_task: row.get(9)?,
        })
    }

    fn weekly_task_from_row(row: &Row<'_>) -> rusqlite::Result<WeeklyTask> {
        let id: String = row.get(0)?;
        let priority: String = row.get(5)?;

        Ok(WeeklyTask {
            id: WeeklyTaskId::from_string(&id).map_err(conversion(0))?,
            week: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            parent_project: row.get(4)?,
            priority: priority.parse().map_err(conversion(5))?,
        })
    }
}

impl SnapshotStore for SqliteStore {
    fn load(&self) -> Result<Option<TimeManagementData>, StorageError> {
        let Some(start_date) = self.meta("start_date")? else {
            return Ok(None);
        };
        let start_date: NaiveDate = parse_date(&start_date)
            .map_err(|e| StorageError::Connection(format!("Corrupt start_date in meta table: {}", e)))?;

        if let Some(version) = self.meta("snapshot_version")? {
            let found: u32 = version.parse().unwrap_or(0);
            if found > SNAPSHOT_VERSION {
                return Err(StorageError::UnsupportedVersion {
                    found,
                    supported: SNAPSHOT_VERSION,
                });
            }
        }

        let mut data = TimeManagementData::new(start_date);

        let mut stmt = self.conn.prepare(
            "SELECT week_number, date_range FROM weeks ORDER BY week_number",
        )?;
        let weeks = stmt.query_map([], |row| Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?)))?;
        for week in weeks {
            let (number, date_range) = week?;
            data.weekly_schedules.insert(number, WeeklySchedule::new(number, date_range));
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, date, name, start_time, end_time, description,
                    can_reschedule, can_compress, can_parallel, parent_task
             FROM daily_tasks ORDER BY date, start_time",
        )?;
        let tasks = stmt.query_map([], Self::daily_task_from_row)?;
        for task in tasks {
            let task = task?;
            let week_number = data.week_number(task.date);
            data.daily_schedules
                .entry(task.date)
                .or_insert_with(|| DailySchedule::new(task.date, week_number))
                .tasks
                .push(task);
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, week_number, name, description, parent_project, priority
             FROM weekly_tasks ORDER BY week_number, position",
        )?;
        let tasks = stmt.query_map([], Self::weekly_task_from_row)?;
        for task in tasks {
            let task = task?;
            match data.week_mut(task.week) {
                Ok(week) => week.tasks.push(task),
                Err(e) => tracing::warn!("Skipping stored weekly task '{}': {}", task.name, e),
            }
        }

        data.normalize();
        tracing::debug!(
            "Loaded snapshot from {:?}: {} daily tasks, {} weekly tasks",
            self.path,
            data.daily_task_count(),
            data.weekly_task_count()
        );
        Ok(Some(data))
    }

    fn save(&self, data: &TimeManagementData) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute("DELETE FROM meta", [])?;
        tx.execute("DELETE FROM weeks", [])?;
        tx.execute("DELETE FROM daily_tasks", [])?;
        tx.execute("DELETE FROM weekly_tasks", [])?;

        tx.execute(
            "INSERT INTO meta (key, value) VALUES ('start_date', ?1), ('snapshot_version', ?2)",
            params![format_date(data.start_date), data.version.to_string()],
        )?;

        {
            let mut insert_day = tx.prepare(
                "INSERT INTO daily_tasks (
                    id, date, name, start_time, end_time, description,
                    can_reschedule, can_compress, can_parallel, parent_task
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for task in data.daily_schedules.values().flat_map(|day| day.tasks.iter()) {
                insert_day.execute(params![
                    task.id.to_string(),
                    format_date(task.date),
                    task.name,
                    format_hhmm(task.start_time),
                    format_hhmm(task.end_time),
                    task.description,
                    task.can_reschedule,
                    task.can_compress,
                    task.can_parallel,
                    task.parent_task,
                ])?;
            }

            let mut insert_week = tx.prepare("INSERT INTO weeks (week_number, date_range) VALUES (?1, ?2)")?;
            let mut insert_weekly = tx.prepare(
                "INSERT INTO weekly_tasks (
                    id, week_number, name, description, parent_project, priority, position
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (number, week) in &data.weekly_schedules {
                insert_week.execute(params![number, week.date_range])?;
                for (position, task) in week.tasks.iter().enumerate() {
                    insert_weekly.execute(params![
                        task.id.to_string(),
                        number,
                        task.name,
                        task.description,
                        task.parent_project,
                        task.priority.as_str(),
                        position as i64,
                    ])?;
                }
            }
        }

        tx.commit()?;
        tracing::debug!("Wrote snapshot to {:?}", self.path);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}
