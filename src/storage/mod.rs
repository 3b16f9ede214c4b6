pub mod database;
pub mod memory;
pub mod task_store;

pub use database::{Database, PoolConfig, SharedDatabase, StepCheckpoint};
pub use memory::MemoryTaskStore;
pub use task_store::{SharedTaskStore, SqliteTaskStore, TaskStore};
