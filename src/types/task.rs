//! Task Record Types
//!
//! A task is one article generation request. It is created `Pending` by the
//! request handler and moved to a terminal status exactly once by the workflow.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a task, stored as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TaskStatus {
    Pending = 1,
    Complete = 2,
    Failed = 3,
}

impl TaskStatus {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Pending),
            2 => Some(Self::Complete),
            3 => Some(Self::Failed),
            _ => None,
        }
    }

    /// Complete and Failed are terminal; nothing leaves them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether a record currently in `self` may be moved to `next`.
    ///
    /// Replaying the same terminal status is accepted (last write wins);
    /// switching between terminal statuses is not.
    pub fn accepts(&self, next: TaskStatus) -> bool {
        match self {
            Self::Pending => true,
            current => *current == next,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl From<TaskStatus> for u8 {
    fn from(status: TaskStatus) -> Self {
        status.as_u8()
    }
}

impl TryFrom<u8> for TaskStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_u8(code).ok_or_else(|| format!("Unknown task status code: {}", code))
    }
}

/// A reference supporting generated content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub url: String,
}

impl Source {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            title: None,
            url: url.into(),
        }
    }

    pub fn titled(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            url: url.into(),
        }
    }
}

/// Persisted task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub topic: String,
    pub status: TaskStatus,
    pub content: Option<String>,
    #[serde(default)]
    pub sources: Vec<Source>,
    pub created_at: String,
    pub owner: String,
}

impl Task {
    /// New pending task with a fresh id.
    pub fn new(topic: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            topic: topic.into(),
            status: TaskStatus::Pending,
            content: None,
            sources: Vec::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
            owner: owner.into(),
        }
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, update: &TaskUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(content) = &update.content {
            self.content = Some(content.clone());
        }
        if let Some(sources) = &update.sources {
            self.sources = sources.clone();
        }
        if let Some(topic) = &update.topic {
            self.topic = topic.clone();
        }
    }

    pub fn has_content(&self) -> bool {
        self.content
            .as_deref()
            .is_some_and(|content| !content.trim().is_empty())
    }

    /// What a poller sees for this task.
    pub fn poll_status(&self) -> TaskProgress {
        let state = match self.status {
            TaskStatus::Pending => PollState::Running,
            TaskStatus::Complete => PollState::Done,
            TaskStatus::Failed => PollState::Errored,
        };
        TaskProgress {
            id: self.id.clone(),
            status: self.status,
            state,
            completed: self.status.is_terminal(),
            has_content: self.has_content(),
        }
    }
}

/// Partial task update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub content: Option<String>,
    pub sources: Option<Vec<Source>>,
    pub topic: Option<String>,
}

impl TaskUpdate {
    /// Success record: body without heading, reconciled sources, extracted title.
    pub fn complete(body: String, sources: Vec<Source>, title: String) -> Self {
        Self {
            status: Some(TaskStatus::Complete),
            content: Some(body),
            sources: Some(sources),
            topic: Some(title),
        }
    }

    /// Error record: keeps the original topic.
    pub fn failed(content: String, sources: Vec<Source>, original_topic: String) -> Self {
        Self {
            status: Some(TaskStatus::Failed),
            content: Some(content),
            sources: Some(sources),
            topic: Some(original_topic),
        }
    }

    /// Whether this update may be applied to a record currently in `current`.
    ///
    /// Terminal records only take replays carrying their own status.
    pub fn allowed_from(&self, current: TaskStatus) -> bool {
        match self.status {
            Some(next) => current.accepts(next),
            None => !current.is_terminal(),
        }
    }
}

/// Result of a store update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOutcome {
    Applied,
    NotFound,
    /// The record is already terminal with a different status.
    Rejected { current: TaskStatus },
}

/// Coarse state shown to pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollState {
    Running,
    Done,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskProgress {
    pub id: String,
    pub status: TaskStatus,
    pub state: PollState,
    pub completed: bool,
    pub has_content: bool,
}
