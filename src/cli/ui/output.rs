use console::style;

use crate::types::{Source, TaskStatus};

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    pub fn field(&self, label: &str, value: &str) {
        println!("  {:<10} {}", style(label).dim(), value);
    }

    pub fn status(&self, status: TaskStatus) -> String {
        match status {
            TaskStatus::Pending => style("pending").yellow().to_string(),
            TaskStatus::Complete => style("complete").green().to_string(),
            TaskStatus::Failed => style("failed").red().to_string(),
        }
    }

    pub fn sources(&self, sources: &[Source]) {
        if sources.is_empty() {
            println!("  {}", style("(none)").dim());
            return;
        }
        for (i, source) in sources.iter().enumerate() {
            match &source.title {
                Some(title) => println!("  {}. {} {}", i + 1, title, style(&source.url).dim()),
                None => println!("  {}. {}", i + 1, source.url),
            }
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
