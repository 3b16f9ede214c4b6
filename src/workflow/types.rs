//! Workflow data types: requests, step outputs and partial run state.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::splitter::SplitDocument;
use crate::types::{Source, Task, TaskUpdate};

/// What the workflow needs to know about the task it runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRequest {
    pub id: String,
    pub topic: String,
    pub owner: String,
}

impl From<&Task> for ArticleRequest {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            topic: task.topic.clone(),
            owner: task.owner.clone(),
        }
    }
}

/// Output of the research step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatherResult {
    pub text: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Output of the extraction step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub learnings: Vec<String>,
    pub sources: Vec<Source>,
    #[serde(default)]
    pub search_queries: Vec<String>,
}

/// What a run has produced so far, kept for the failure record.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub learnings: Vec<String>,
    pub sources: Vec<Source>,
    pub draft: Option<String>,
    pub document: Option<SplitDocument>,
}

impl RunState {
    /// Best content available for an error record.
    ///
    /// Prefers the split body, then the raw draft, then a generated report.
    pub fn error_content(&self, topic: &str, error: &str) -> String {
        if let Some(document) = &self.document {
            return document.body.clone();
        }
        if let Some(draft) = &self.draft {
            return draft.clone();
        }
        error_report(topic, error)
    }

    /// Failed-status update carrying whatever was produced, under the original topic.
    pub fn failure_update(&self, topic: &str, error: &str) -> TaskUpdate {
        TaskUpdate::failed(
            self.error_content(topic, error),
            self.sources.clone(),
            topic.to_string(),
        )
    }
}

/// Markdown shown to users when no draft was produced.
pub fn error_report(topic: &str, error: &str) -> String {
    format!(
        "## Error Generating Article\n\nAn error occurred while generating the article for topic: \"{}\".\n\nError details: {}",
        topic, error
    )
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub task_id: String,
    pub title: String,
    pub body: String,
    pub sources: Vec<Source>,
    pub learnings_count: usize,
    pub search_queries: Vec<String>,
}
