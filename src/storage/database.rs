//! Database Layer with Connection Pooling and Safe Transactions
//!
//! Production-ready SQLite database layer featuring:
//! - Connection pooling via r2d2 for concurrent access
//! - Panic-safe transactions with automatic rollback
//! - Version-tracked migrations
//! - WAL mode for optimal read/write performance

use std::path::Path;
use std::sync::Arc;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, params};

use crate::types::{ArticleError, Result, ResultExt, Source, Task, TaskStatus, TaskUpdate, UpdateOutcome};

/// Shared database handle for async contexts.
pub type SharedDatabase = Arc<Database>;

const SCHEMA: &str = include_str!("schema.sql");

/// Current schema version for migration tracking
const SCHEMA_VERSION: u32 = 2;

/// Migration definitions
struct Migration {
    version: u32,
    description: &'static str,
    up: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Add tasks.updated_at column",
        up: "ALTER TABLE tasks ADD COLUMN updated_at TEXT",
    },
    Migration {
        version: 2,
        description: "Add step checkpoint attempt counter",
        up: "ALTER TABLE step_checkpoints ADD COLUMN attempts INTEGER NOT NULL DEFAULT 1",
    },
];

/// Stored output of a completed workflow step
#[derive(Debug, Clone)]
pub struct StepCheckpoint {
    pub task_id: String,
    pub step_name: String,
    pub output: serde_json::Value,
    pub attempts: u32,
    pub completed_at: String,
}

/// Type alias for task row data (id, topic, status, content, sources, created_at, owner)
type TaskRow = (String, String, u8, Option<String>, String, String, String);

/// Connection pool configuration
///
/// Pool size is dynamically calculated based on CPU cores for optimal performance.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool
    pub max_size: u32,
    /// Minimum idle connections to keep ready
    pub min_idle: u32,
    /// Timeout for acquiring a connection (seconds)
    pub connection_timeout_secs: u64,
}

impl PoolConfig {
    /// Minimum pool size regardless of CPU count
    const MIN_POOL_SIZE: u32 = 2;
    /// Maximum pool size regardless of CPU count
    const MAX_POOL_SIZE: u32 = 16;

    /// Calculate optimal pool size based on available CPU cores
    ///
    /// Formula: clamp(cores, MIN, MAX). Writes are serialized by SQLite, so
    /// extra connections only help concurrent pollers.
    pub fn optimal_pool_size() -> u32 {
        let cores = std::thread::available_parallelism()
            .map(|p| p.get() as u32)
            .unwrap_or(4);

        cores.clamp(Self::MIN_POOL_SIZE, Self::MAX_POOL_SIZE)
    }

    /// Create config with automatic pool sizing based on CPU cores
    pub fn auto() -> Self {
        let max_size = Self::optimal_pool_size();
        Self {
            max_size,
            min_idle: (max_size / 4).max(1),
            connection_timeout_secs: 30,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::auto()
    }
}

/// Thread-safe database with connection pooling.
///
/// Uses r2d2 connection pool for concurrent access with automatic
/// connection management and health checking.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open database with connection pooling at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, PoolConfig::default())
    }

    /// Open database with custom pool configuration.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: PoolConfig) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let manager =
            SqliteConnectionManager::file(path.as_ref()).with_init(Self::configure_connection);

        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(Some(config.min_idle))
            .connection_timeout(std::time::Duration::from_secs(
                config.connection_timeout_secs,
            ))
            .build(manager)
            .map_err(|e| {
                ArticleError::Storage(format!("Failed to create connection pool: {}", e))
            })?;

        Ok(Self { pool })
    }

    /// Open an in-memory database for testing or temporary use.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });

        let pool = Pool::builder().max_size(1).build(manager).map_err(|e| {
            ArticleError::Storage(format!("Failed to create in-memory pool: {}", e))
        })?;

        Ok(Self { pool })
    }

    /// Configure a new connection with production-ready settings.
    fn configure_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            PRAGMA wal_autocheckpoint = 1000;
            "#,
        )?;
        Ok(())
    }

    /// Get a connection from the pool.
    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            ArticleError::Storage(format!("Failed to acquire database connection: {}", e))
        })
    }

    /// Initialize database schema.
    ///
    /// A fresh database gets the full schema at the current version; an
    /// existing one is brought forward by the pending migrations.
    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;
        let current_version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        if current_version > 0 {
            drop(conn);
            return self.migrate(current_version);
        }

        conn.execute_batch(SCHEMA)
            .with_context("Failed to initialize database schema")?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .with_context("Failed to set schema version")?;
        Ok(())
    }

    /// Run version-tracked migrations newer than `current_version`.
    fn migrate(&self, current_version: u32) -> Result<()> {
        let conn = self.conn()?;

        for migration in MIGRATIONS {
            if migration.version > current_version {
                conn.execute_batch(migration.up).with_context_fn(|| {
                    format!(
                        "Failed to apply migration {}: {}",
                        migration.version, migration.description
                    )
                })?;

                tracing::info!(
                    "Applied migration {}: {}",
                    migration.version,
                    migration.description
                );
            }
        }

        if current_version < SCHEMA_VERSION {
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)
                .with_context("Failed to update schema version")?;
        }

        Ok(())
    }

    /// Get a raw connection for advanced operations.
    pub fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.conn()
    }

    /// Execute a function within a panic-safe database transaction.
    ///
    /// All operations within the closure are atomic. If the closure panics,
    /// the transaction is automatically rolled back and an error is returned
    /// instead of poisoning the connection pool.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + std::panic::UnwindSafe,
    {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .with_context("Failed to start transaction")?;

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(&tx)));

        match result {
            Ok(Ok(value)) => {
                tx.commit().with_context("Failed to commit transaction")?;
                Ok(value)
            }
            // Rolled back on drop
            Ok(Err(e)) => Err(e),
            Err(panic_payload) => {
                let panic_msg = panic_payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic_payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "Unknown panic".to_string());

                tracing::error!("Transaction panicked: {}", panic_msg);
                Err(ArticleError::Storage(format!(
                    "Transaction panicked: {}",
                    panic_msg
                )))
            }
        }
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    /// Insert a new task record.
    pub fn insert_task(&self, task: &Task) -> Result<()> {
        let sources =
            serde_json::to_string(&task.sources).with_context("Failed to serialize sources")?;

        self.conn()?
            .execute(
                "INSERT INTO tasks (id, topic, status, content, sources, created_at, owner)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    task.id,
                    task.topic,
                    task.status.as_u8(),
                    task.content,
                    sources,
                    task.created_at,
                    task.owner,
                ],
            )
            .with_context_fn(|| format!("Failed to insert task {}", task.id))?;

        tracing::debug!("Inserted task {}", task.id);
        Ok(())
    }

    /// Load one task by id.
    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let row: Option<TaskRow> = self
            .conn()?
            .query_row(
                "SELECT id, topic, status, content, sources, created_at, owner
                 FROM tasks WHERE id = ?1",
                [id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                    ))
                },
            )
            .optional()?;

        row.map(Self::task_from_row).transpose()
    }

    /// Most recent tasks first.
    pub fn list_tasks(&self, limit: usize) -> Result<Vec<Task>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, topic, status, content, sources, created_at, owner
             FROM tasks ORDER BY created_at DESC LIMIT ?1",
        )?;

        let rows: Vec<TaskRow> = stmt
            .query_map([limit as i64], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter().map(Self::task_from_row).collect()
    }

    /// Apply a partial update, guarding terminal records.
    ///
    /// The status check and the write happen in one transaction so a
    /// concurrent execution cannot slip a different terminal status in between.
    pub fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<UpdateOutcome> {
        self.transaction(|conn| {
            let code: Option<u8> = conn
                .query_row("SELECT status FROM tasks WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;

            let Some(code) = code else {
                return Ok(UpdateOutcome::NotFound);
            };
            let current = Self::status_from_code(code)?;
            if !update.allowed_from(current) {
                return Ok(UpdateOutcome::Rejected { current });
            }

            let mut set_clauses = vec!["updated_at = ?1".to_string()];
            let mut param_values: Vec<Box<dyn rusqlite::ToSql>> =
                vec![Box::new(chrono::Utc::now().to_rfc3339())];

            if let Some(status) = update.status {
                param_values.push(Box::new(status.as_u8()));
                set_clauses.push(format!("status = ?{}", param_values.len()));
            }
            if let Some(content) = &update.content {
                param_values.push(Box::new(content.clone()));
                set_clauses.push(format!("content = ?{}", param_values.len()));
            }
            if let Some(sources) = &update.sources {
                let json = serde_json::to_string(sources)?;
                param_values.push(Box::new(json));
                set_clauses.push(format!("sources = ?{}", param_values.len()));
            }
            if let Some(topic) = &update.topic {
                param_values.push(Box::new(topic.clone()));
                set_clauses.push(format!("topic = ?{}", param_values.len()));
            }

            param_values.push(Box::new(id.to_string()));
            let query = format!(
                "UPDATE tasks SET {} WHERE id = ?{}",
                set_clauses.join(", "),
                param_values.len()
            );

            let params_refs: Vec<&dyn rusqlite::ToSql> =
                param_values.iter().map(|p| p.as_ref()).collect();
            conn.execute(&query, params_refs.as_slice())?;

            Ok(UpdateOutcome::Applied)
        })
    }

    fn status_from_code(code: u8) -> Result<TaskStatus> {
        TaskStatus::from_u8(code)
            .ok_or_else(|| ArticleError::Storage(format!("Unknown task status code: {}", code)))
    }

    fn task_from_row(row: TaskRow) -> Result<Task> {
        let (id, topic, status, content, sources, created_at, owner) = row;
        let sources: Vec<Source> = serde_json::from_str(&sources)
            .with_context_fn(|| format!("Corrupt sources for task {}", id))?;

        Ok(Task {
            status: Self::status_from_code(status)?,
            id,
            topic,
            content,
            sources,
            created_at,
            owner,
        })
    }

    // =========================================================================
    // Step Checkpoints
    // =========================================================================

    /// Store (or replace) the output of a completed step.
    pub fn store_step_checkpoint(
        &self,
        task_id: &str,
        step_name: &str,
        output: &serde_json::Value,
        attempts: u32,
    ) -> Result<()> {
        let output_str =
            serde_json::to_string(output).with_context("Failed to serialize step output")?;
        let checksum = crc32fast::hash(output_str.as_bytes());
        let now = chrono::Utc::now().to_rfc3339();

        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO step_checkpoints
                 (task_id, step_name, output, checksum, attempts, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![task_id, step_name, output_str, checksum, attempts, now],
            )
            .with_context_fn(|| format!("Failed to checkpoint step '{}'", step_name))?;

        tracing::debug!(
            "Checkpointed step: task={}, step={}, attempts={}",
            task_id,
            step_name,
            attempts
        );
        Ok(())
    }

    /// Load a step checkpoint.
    ///
    /// A checkpoint whose checksum or JSON does not verify is treated as
    /// missing so the step runs again.
    pub fn load_step_checkpoint(
        &self,
        task_id: &str,
        step_name: &str,
    ) -> Result<Option<StepCheckpoint>> {
        let row: Option<(String, u32, u32, String)> = self
            .conn()?
            .query_row(
                "SELECT output, checksum, attempts, completed_at
                 FROM step_checkpoints WHERE task_id = ?1 AND step_name = ?2",
                params![task_id, step_name],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((output_str, checksum, attempts, completed_at)) = row else {
            return Ok(None);
        };

        if crc32fast::hash(output_str.as_bytes()) != checksum {
            tracing::warn!(
                "Checkpoint checksum mismatch for task={}, step={}; re-running step",
                task_id,
                step_name
            );
            return Ok(None);
        }

        match serde_json::from_str(&output_str) {
            Ok(output) => Ok(Some(StepCheckpoint {
                task_id: task_id.to_string(),
                step_name: step_name.to_string(),
                output,
                attempts,
                completed_at,
            })),
            Err(e) => {
                tracing::warn!(
                    "Unreadable checkpoint for task={}, step={}: {}",
                    task_id,
                    step_name,
                    e
                );
                Ok(None)
            }
        }
    }

    /// Names and completion times of the checkpointed steps of a task.
    pub fn list_step_checkpoints(&self, task_id: &str) -> Result<Vec<(String, u32, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT step_name, attempts, completed_at FROM step_checkpoints
             WHERE task_id = ?1 ORDER BY completed_at ASC",
        )?;

        let rows = stmt
            .query_map([task_id], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Delete all checkpoints of a task.
    pub fn clear_step_checkpoints(&self, task_id: &str) -> Result<usize> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM step_checkpoints WHERE task_id = ?1", [task_id])
            .with_context("Failed to clear step checkpoints")?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn db() -> Database {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        db.initialize().expect("Failed to initialize schema");
        db
    }

    #[test]
    fn test_open_in_memory() {
        let db = db();

        let conn = db.connection().expect("Failed to get connection");
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"tasks".to_string()));
        assert!(tables.contains(&"step_checkpoints".to_string()));

        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let db = db();
        db.initialize().expect("Second initialize should be a no-op");
    }

    #[test]
    fn test_transaction_panic_safety() {
        let db = db();

        let result = db.transaction(|_conn| {
            panic!("Intentional panic for testing");
            #[allow(unreachable_code)]
            Ok(())
        });

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("panicked"));
        assert!(
            db.connection().is_ok(),
            "Database should still be accessible after panic"
        );
    }

    #[test]
    fn test_task_roundtrip() {
        let db = db();
        let mut task = Task::new("Restorative practices in middle school", "alice");
        task.sources = vec![Source::titled("A", "https://a.example")];
        db.insert_task(&task).unwrap();

        let loaded = db.get_task(&task.id).unwrap().unwrap();
        assert_eq!(loaded, task);
        assert!(db.get_task("missing").unwrap().is_none());
    }

    #[test]
    fn test_update_task_guards_terminal_status() {
        let db = db();
        let task = Task::new("Formative assessment strategies", "bob");
        db.insert_task(&task).unwrap();

        let complete = TaskUpdate::complete(
            "Body".to_string(),
            vec![Source::new("https://a.example")],
            "Title".to_string(),
        );
        assert_eq!(db.update_task(&task.id, &complete).unwrap(), UpdateOutcome::Applied);
        // Same-status replay is accepted
        assert_eq!(db.update_task(&task.id, &complete).unwrap(), UpdateOutcome::Applied);

        let failed = TaskUpdate::failed("err".to_string(), vec![], task.topic.clone());
        assert_eq!(
            db.update_task(&task.id, &failed).unwrap(),
            UpdateOutcome::Rejected {
                current: TaskStatus::Complete
            }
        );

        let loaded = db.get_task(&task.id).unwrap().unwrap();
        assert_eq!(loaded.status, TaskStatus::Complete);
        assert_eq!(loaded.topic, "Title");
        assert_eq!(loaded.content.as_deref(), Some("Body"));
        assert_eq!(loaded.sources, vec![Source::new("https://a.example")]);
        assert_eq!(loaded.created_at, task.created_at);

        assert_eq!(
            db.update_task("missing", &complete).unwrap(),
            UpdateOutcome::NotFound
        );
    }

    #[test]
    fn test_list_tasks_most_recent_first() {
        let db = db();
        let mut older = Task::new("Older topic for listing", "a");
        older.created_at = "2026-01-01T00:00:00+00:00".to_string();
        let mut newer = Task::new("Newer topic for listing", "a");
        newer.created_at = "2026-02-01T00:00:00+00:00".to_string();
        db.insert_task(&older).unwrap();
        db.insert_task(&newer).unwrap();

        let tasks = db.list_tasks(10).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, newer.id);
        assert_eq!(db.list_tasks(1).unwrap().len(), 1);
    }

    #[test]
    fn test_step_checkpoint_roundtrip() {
        let db = db();
        let output = json!({"text": "LEARNING: one", "metadata": null});

        assert!(db.load_step_checkpoint("t1", "gather information").unwrap().is_none());
        db.store_step_checkpoint("t1", "gather information", &output, 2)
            .unwrap();

        let checkpoint = db
            .load_step_checkpoint("t1", "gather information")
            .unwrap()
            .unwrap();
        assert_eq!(checkpoint.output, output);
        assert_eq!(checkpoint.attempts, 2);

        let steps = db.list_step_checkpoints("t1").unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].0, "gather information");

        assert_eq!(db.clear_step_checkpoints("t1").unwrap(), 1);
        assert!(db.load_step_checkpoint("t1", "gather information").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_checkpoint_is_ignored() {
        let db = db();
        db.store_step_checkpoint("t1", "write article", &json!("draft"), 1)
            .unwrap();

        db.connection()
            .unwrap()
            .execute(
                "UPDATE step_checkpoints SET output = '\"tampered\"' WHERE task_id = 't1'",
                [],
            )
            .unwrap();

        assert!(db.load_step_checkpoint("t1", "write article").unwrap().is_none());
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("articles.db");
        let task = Task::new("Persisted across reopen", "carol");

        {
            let db = Database::open(&path).unwrap();
            db.initialize().unwrap();
            db.insert_task(&task).unwrap();
        }

        let db = Database::open(&path).unwrap();
        db.initialize().unwrap();
        assert!(db.get_task(&task.id).unwrap().is_some());
    }

    #[test]
    fn test_pool_config_optimal_sizing() {
        let size = PoolConfig::optimal_pool_size();
        assert!(size >= PoolConfig::MIN_POOL_SIZE);
        assert!(size <= PoolConfig::MAX_POOL_SIZE);

        let auto = PoolConfig::auto();
        assert_eq!(auto.max_size, size);
        assert!(auto.min_idle >= 1);
        assert!(auto.min_idle <= auto.max_size);
    }
}
