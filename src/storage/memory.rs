//! In-memory task store.
//!
//! Uses DashMap for concurrent access. The shard write guard is held across
//! the terminal-status check and the write.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::task_store::TaskStore;
use crate::types::{ArticleError, Result, Task, TaskUpdate, UpdateOutcome};

#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: DashMap<String, Task>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create(&self, task: &Task) -> Result<()> {
        match self.tasks.entry(task.id.clone()) {
            Entry::Occupied(_) => Err(ArticleError::Storage(format!(
                "Task {} already exists",
                task.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(task.clone());
                Ok(())
            }
        }
    }

    async fn update_by_id(&self, id: &str, update: &TaskUpdate) -> Result<UpdateOutcome> {
        let Some(mut task) = self.tasks.get_mut(id) else {
            return Ok(UpdateOutcome::NotFound);
        };

        if !update.allowed_from(task.status) {
            return Ok(UpdateOutcome::Rejected {
                current: task.status,
            });
        }

        task.apply(update);
        Ok(UpdateOutcome::Applied)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.tasks.get(id).map(|task| task.value().clone()))
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self.tasks.iter().map(|entry| entry.value().clone()).collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks.truncate(limit);
        Ok(tasks)
    }
}
