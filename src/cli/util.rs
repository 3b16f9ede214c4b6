//! CLI Common Utilities
//!
//! Shared initialization and context management for CLI commands.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::ai::provider::create_generator;
use crate::config::{Config, ConfigLoader};
use crate::constants::topic;
use crate::storage::{Database, SharedDatabase, SharedTaskStore, SqliteTaskStore};
use crate::types::{ArticleError, Result, Task};
use crate::workflow::{ArticleWorkflow, DurableStepRunner};

/// Command execution context
///
/// Loaded configuration plus an opened, migrated task database.
#[derive(Clone)]
pub struct CommandContext {
    pub config: Config,
    pub db: SharedDatabase,
    pub store: SharedTaskStore,
    pub db_path: PathBuf,
}

impl CommandContext {
    pub fn load() -> Result<Self> {
        let config = ConfigLoader::load()?;
        let db_path = ConfigLoader::database_path(&config);

        let db = Database::open(&db_path)?;
        db.initialize()?;
        let db = Arc::new(db);

        Ok(Self {
            config,
            store: Arc::new(SqliteTaskStore::new(db.clone())),
            db,
            db_path,
        })
    }

    /// Build the workflow with the configured search and writer models
    pub fn workflow(&self) -> Result<ArticleWorkflow> {
        let search = create_generator(&self.config.llm.search_provider_config())?;
        let writer = create_generator(&self.config.llm.writer_provider_config())?;
        Ok(ArticleWorkflow::new(self.store.clone(), search, writer))
    }

    /// Checkpointing runner for one task
    pub fn runner(&self, task_id: &str) -> DurableStepRunner {
        DurableStepRunner::new(self.db.clone(), task_id)
            .with_policy(self.config.workflow.retry_policy())
    }

    pub async fn require_task(&self, id: &str) -> Result<Task> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| ArticleError::TaskNotFound(id.to_string()))
    }

    /// Drop a task's step checkpoints once its record is terminal.
    ///
    /// A task that is still pending keeps them so `run` can resume it.
    pub async fn release_checkpoints(&self, task_id: &str) -> Result<usize> {
        match self.store.get_by_id(task_id).await? {
            Some(task) if task.status.is_terminal() => {
                let cleared = self.db.clear_step_checkpoints(task_id)?;
                debug!("Cleared {} step checkpoints for task {}", cleared, task_id);
                Ok(cleared)
            }
            _ => Ok(0),
        }
    }
}

/// Trim a topic and check its length in chars.
pub fn validate_topic(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();

    if len < topic::MIN_CHARS {
        return Err(ArticleError::Validation(format!(
            "Topic must be at least {} characters long",
            topic::MIN_CHARS
        )));
    }
    if len > topic::MAX_CHARS {
        return Err(ArticleError::Validation(format!(
            "Topic must be at most {} characters long",
            topic::MAX_CHARS
        )));
    }

    Ok(trimmed.to_string())
}
