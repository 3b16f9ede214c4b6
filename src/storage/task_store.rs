//! Task persistence seam used by the workflow and the CLI.

use async_trait::async_trait;
use std::sync::Arc;

use super::database::SharedDatabase;
use crate::types::{Result, Task, TaskUpdate, UpdateOutcome};

/// Durable record of task status, content and sources.
///
/// Implementations must reject moving a terminal record to a different
/// terminal status and must accept same-status replays.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a new task record
    async fn create(&self, task: &Task) -> Result<()>;

    /// Apply a partial update to one task
    async fn update_by_id(&self, id: &str, update: &TaskUpdate) -> Result<UpdateOutcome>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Task>>;

    /// Most recently created tasks first
    async fn list_recent(&self, limit: usize) -> Result<Vec<Task>>;
}

/// Shared store type for concurrent access.
pub type SharedTaskStore = Arc<dyn TaskStore>;

/// SQLite-backed task store
#[derive(Clone)]
pub struct SqliteTaskStore {
    db: SharedDatabase,
}

impl SqliteTaskStore {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &SharedDatabase {
        &self.db
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn create(&self, task: &Task) -> Result<()> {
        self.db.insert_task(task)
    }

    async fn update_by_id(&self, id: &str, update: &TaskUpdate) -> Result<UpdateOutcome> {
        self.db.update_task(id, update)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Task>> {
        self.db.get_task(id)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Task>> {
        self.db.list_tasks(limit)
    }
}
