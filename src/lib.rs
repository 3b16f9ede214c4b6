//! articlegen - Grounded Article Generation
//!
//! Turns a short topic into a sourced Markdown article: a search-grounded
//! research pass, marker parsing and source reconciliation, a drafting pass,
//! then title extraction and a persisted task record.
//!
//! ## Core Features
//!
//! - **Durable Steps**: every step is checkpointed in SQLite and replayed on resume
//! - **Source Reconciliation**: parsed and grounding sources merged by first-seen URL
//! - **Terminal Guard**: a Complete or Failed task is never overwritten by the other status
//! - **Gemini Provider**: Google search grounding with optional AI Gateway routing
//!
//! ## Quick Start
//!
//! ```ignore
//! use articlegen::{ArticleWorkflow, Database, DurableStepRunner, SqliteTaskStore};
//!
//! let db = Arc::new(Database::open("articlegen.db")?);
//! db.initialize()?;
//! let store = Arc::new(SqliteTaskStore::new(db.clone()));
//! let workflow = ArticleWorkflow::new(store, search, writer);
//! let runner = DurableStepRunner::new(db, &task.id);
//! let outcome = workflow.run(&ArticleRequest::from(&task), &runner).await?;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: Gemini provider, grounding metadata, prompts
//! - [`workflow`]: parser, reconciler, splitter, step runners, orchestrator
//! - [`storage`]: SQLite persistence and task stores
//! - [`config`]: layered configuration

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod storage;
pub mod types;
pub mod workflow;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, LlmConfig};

// Error Types
pub use types::error::{ArticleError, ErrorCategory, Result, ResultExt};

// Domain
pub use types::{Source, Task, TaskStatus, TaskUpdate, UpdateOutcome};

// Storage
pub use storage::database::PoolConfig;
pub use storage::{Database, MemoryTaskStore, SharedDatabase, SqliteTaskStore, TaskStore};

// =============================================================================
// Workflow Re-exports
// =============================================================================

pub use workflow::{
    ArticleRequest, ArticleWorkflow, DurableStepRunner, InlineStepRunner, RunOutcome,
    StepRunner, reconcile, split_title,
};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{GeminiProvider, Generation, SharedGenerator, TextGenerator, create_generator};
