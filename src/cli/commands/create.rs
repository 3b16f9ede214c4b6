//! Create Command
//!
//! Validate a topic, record a pending task and generate its article.

use tracing::info;

use crate::cli::commands::run::generate;
use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, validate_topic};
use crate::types::{Result, Task};

pub async fn run(topic: &str, owner: &str) -> Result<()> {
    let output = Output::new();
    let topic = validate_topic(topic)?;
    let ctx = CommandContext::load()?;

    let task = Task::new(topic, owner);
    ctx.store.create(&task).await?;
    info!("Created task {} for owner {}", task.id, task.owner);
    output.info(&format!("Task {} created", task.id));

    generate(&ctx, &task, &output).await
}
