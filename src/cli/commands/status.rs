//! Status Command
//!
//! Poll surface for a single task.

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::Result;

pub async fn run(id: &str, format: &str) -> Result<()> {
    let ctx = CommandContext::load()?;
    let task = ctx.require_task(id).await?;
    let progress = task.poll_status();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&progress)?);
        return Ok(());
    }

    let output = Output::new();
    output.field("Task", &progress.id);
    output.field("Status", &output.status(progress.status));
    output.field("Completed", if progress.completed { "yes" } else { "no" });
    output.field("Content", if progress.has_content { "yes" } else { "no" });

    let steps = ctx.db.list_step_checkpoints(&task.id)?;
    if !steps.is_empty() {
        output.section("Completed Steps");
        for (name, attempts, completed_at) in steps {
            println!("  {:<20} {} attempt(s)  {}", name, attempts, completed_at);
        }
    }

    Ok(())
}
