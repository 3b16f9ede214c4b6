//! List Command

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::{Result, snippet};

pub async fn run(limit: usize) -> Result<()> {
    let output = Output::new();
    let ctx = CommandContext::load()?;
    let tasks = ctx.store.list_recent(limit).await?;

    if tasks.is_empty() {
        output.info("No tasks yet. Run 'articlegen create <topic>' to start one.");
        return Ok(());
    }

    output.section(&format!("Recent Tasks ({})", tasks.len()));
    for task in tasks {
        println!(
            "  {}  {}  {}  {}",
            task.id,
            output.status(task.status),
            task.created_at.get(..19).unwrap_or(&task.created_at),
            snippet(&task.topic, 60)
        );
    }

    Ok(())
}
