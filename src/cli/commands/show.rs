//! Show Command
//!
//! Print a task's article and sources.

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::Result;

pub async fn run(id: &str) -> Result<()> {
    let output = Output::new();
    let ctx = CommandContext::load()?;
    let task = ctx.require_task(id).await?;

    output.header(&task.topic);
    output.field("Status", &output.status(task.status));
    output.field("Owner", &task.owner);
    output.field("Created", &task.created_at);

    output.section("Content");
    match task.content.as_deref() {
        Some(content) if !content.trim().is_empty() => println!("{}", content),
        _ => output.warning("No content yet"),
    }

    output.section("Sources");
    output.sources(&task.sources);

    Ok(())
}
