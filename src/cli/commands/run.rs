//! Run Command
//!
//! Resume a pending task. Steps completed by an earlier attempt are replayed
//! from their checkpoints.

use tracing::warn;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::{ArticleError, Result, Task};
use crate::workflow::ArticleRequest;

pub async fn run(id: &str) -> Result<()> {
    let output = Output::new();
    let ctx = CommandContext::load()?;
    let task = ctx.require_task(id).await?;

    if task.status.is_terminal() {
        return Err(ArticleError::TerminalConflict {
            id: task.id,
            current: task.status,
        });
    }

    let resumed = ctx.db.list_step_checkpoints(&task.id)?;
    if !resumed.is_empty() {
        output.info(&format!(
            "Resuming with {} completed step(s)",
            resumed.len()
        ));
    }

    generate(&ctx, &task, &output).await
}

/// Run the workflow for `task` with the durable runner and report the result.
pub(crate) async fn generate(ctx: &CommandContext, task: &Task, output: &Output) -> Result<()> {
    let workflow = ctx.workflow()?;
    let runner = ctx.runner(&task.id);

    output.header(&format!("Generating: {}", task.topic));
    let result = workflow.run(&ArticleRequest::from(task), &runner).await;

    if let Err(e) = ctx.release_checkpoints(&task.id).await {
        warn!("Failed to clear step checkpoints for task {}: {}", task.id, e);
    }

    match result {
        Ok(outcome) => {
            output.success(&format!("Article complete: {}", outcome.title));
            output.field("Task", &outcome.task_id);
            output.field("Learnings", &outcome.learnings_count.to_string());
            output.field("Sources", &outcome.sources.len().to_string());
            Ok(())
        }
        Err(e) => {
            output.error(&format!("Generation failed for task {}", task.id));
            Err(e)
        }
    }
}
