pub mod error;
pub mod task;
pub mod utils;

pub use error::{ArticleError, ErrorCategory, ErrorClassifier, LlmError, Result, ResultExt};
pub use task::{
    PollState, Source, Task, TaskProgress, TaskStatus, TaskUpdate, UpdateOutcome,
};
pub use utils::{json_string, json_string_array, snippet};
