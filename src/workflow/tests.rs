//! End-to-end workflow runs against scripted generators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use super::*;
use crate::ai::provider::{Generation, TextGenerator};
use crate::storage::{Database, MemoryTaskStore, SqliteTaskStore, TaskStore};
use crate::types::{ErrorCategory, LlmError, Source, Task, TaskStatus};

const TOPIC: &str = "Collaborative learning in middle school";

enum Reply {
    Text(Generation),
    Fail(LlmError),
}

struct ScriptedGenerator {
    reply: Reply,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl ScriptedGenerator {
    fn text(text: &str) -> Arc<Self> {
        Self::with(Reply::Text(Generation::text_only(text)))
    }

    fn grounded(text: &str, metadata: Value) -> Arc<Self> {
        Self::with(Reply::Text(Generation::text_only(text).with_metadata(metadata)))
    }

    fn failing(category: ErrorCategory, message: &str) -> Arc<Self> {
        Self::with(Reply::Fail(LlmError::with_provider(category, message, "scripted")))
    }

    fn with(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> crate::types::Result<Generation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        match &self.reply {
            Reply::Text(generation) => Ok(generation.clone()),
            Reply::Fail(err) => Err(err.clone().into()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}

/// Fails the named step instead of running it.
struct FailAtRunner {
    step: &'static str,
}

#[async_trait]
impl StepRunner for FailAtRunner {
    async fn run_step<'a>(&self, name: &str, step: StepFn<'a>) -> crate::types::Result<Value> {
        if name == self.step {
            return Err(ArticleError::step(name, "injected failure"));
        }
        step().await
    }
}

/// Store whose updates always fail.
#[derive(Default)]
struct BrokenStore {
    inner: MemoryTaskStore,
    update_attempts: AtomicUsize,
}

#[async_trait]
impl TaskStore for BrokenStore {
    async fn create(&self, task: &Task) -> crate::types::Result<()> {
        self.inner.create(task).await
    }

    async fn update_by_id(
        &self,
        _id: &str,
        _update: &TaskUpdate,
    ) -> crate::types::Result<UpdateOutcome> {
        self.update_attempts.fetch_add(1, Ordering::SeqCst);
        Err(ArticleError::Storage("database unavailable".to_string()))
    }

    async fn get_by_id(&self, id: &str) -> crate::types::Result<Option<Task>> {
        self.inner.get_by_id(id).await
    }

    async fn list_recent(&self, limit: usize) -> crate::types::Result<Vec<Task>> {
        self.inner.list_recent(limit).await
    }
}

fn research_text() -> String {
    "\
SOURCE_TITLE: Edutopia
SOURCE_URL: https://www.edutopia.org/collaborative
LEARNING: Structured roles keep every student accountable in group work.
LEARNING: Think-Pair-Share raises participation among quieter students.
SOURCE_URL: https://www.ascd.org/group-work
"
    .to_string()
}

fn grounding() -> Value {
    json!({
        "groundingMetadata": {
            "groundingChunks": [
                {"web": {"uri": "https://www.ascd.org/group-work", "title": "ASCD"}},
                {"web": {"uri": "https://www.nea.org/collab", "title": "NEA"}}
            ],
            "webSearchQueries": ["collaborative learning middle school"]
        }
    })
}

const DRAFT: &str = "# Making Group Work Work\n\nIntro paragraph.\n\n## Roles\nDetails.";

async fn pending_task(store: &dyn TaskStore) -> Task {
    let task = Task::new(TOPIC, "teacher@example.com");
    store.create(&task).await.unwrap();
    task
}

fn workflow(
    store: Arc<dyn TaskStore>,
    search: Arc<ScriptedGenerator>,
    writer: Arc<ScriptedGenerator>,
) -> ArticleWorkflow {
    ArticleWorkflow::new(store, search, writer)
}

#[tokio::test]
async fn test_successful_run_persists_complete_record() {
    let store = Arc::new(MemoryTaskStore::new());
    let task = pending_task(store.as_ref()).await;
    let search = ScriptedGenerator::grounded(&research_text(), grounding());
    let writer = ScriptedGenerator::text(DRAFT);

    let outcome = workflow(store.clone(), search.clone(), writer.clone())
        .run(&ArticleRequest::from(&task), &InlineStepRunner)
        .await
        .unwrap();

    assert_eq!(outcome.title, "Making Group Work Work");
    assert_eq!(outcome.learnings_count, 2);
    assert_eq!(outcome.search_queries, vec!["collaborative learning middle school"]);

    let saved = store.get_by_id(&task.id).await.unwrap().unwrap();
    assert_eq!(saved.status, TaskStatus::Complete);
    assert_eq!(saved.topic, "Making Group Work Work");
    assert_eq!(
        saved.content.as_deref(),
        Some("Intro paragraph.\n\n## Roles\nDetails.")
    );
    assert_eq!(
        saved.sources,
        vec![
            Source::titled("Edutopia", "https://www.edutopia.org/collaborative"),
            Source::new("https://www.ascd.org/group-work"),
            Source::titled("NEA", "https://www.nea.org/collab"),
        ]
    );
    assert_eq!(saved.created_at, task.created_at);
    assert_eq!(saved.owner, task.owner);

    let prompt = writer.last_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("- Structured roles keep every student accountable in group work."));
    assert!(prompt.contains(TOPIC));
    assert_eq!(search.calls(), 1);
}

#[tokio::test]
async fn test_fallback_learnings_feed_the_writer() {
    let store = Arc::new(MemoryTaskStore::new());
    let task = pending_task(store.as_ref()).await;
    let research: Vec<String> = (1..=15)
        .map(|i| format!("Plain research finding number {} without a marker", i))
        .collect();
    let search = ScriptedGenerator::text(&research.join("\n"));
    let writer = ScriptedGenerator::text(DRAFT);

    let outcome = workflow(store.clone(), search, writer.clone())
        .run(&ArticleRequest::from(&task), &InlineStepRunner)
        .await
        .unwrap();

    assert_eq!(outcome.learnings_count, 15);
    assert_eq!(writer.calls(), 1);
    let prompt = writer.last_prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("- Plain research finding number 15 without a marker"));
}

#[tokio::test]
async fn test_no_learnings_fails_before_writing() {
    let store = Arc::new(MemoryTaskStore::new());
    let task = pending_task(store.as_ref()).await;
    let search = ScriptedGenerator::text("tiny\n\nSOURCE_URL: https://only-source.example");
    let writer = ScriptedGenerator::text(DRAFT);

    let err = workflow(store.clone(), search, writer.clone())
        .run(&ArticleRequest::from(&task), &InlineStepRunner)
        .await
        .unwrap_err();

    assert!(matches!(err, ArticleError::NoLearnings));
    assert_eq!(writer.calls(), 0);

    let saved = store.get_by_id(&task.id).await.unwrap().unwrap();
    assert_eq!(saved.status, TaskStatus::Failed);
    assert_eq!(saved.topic, TOPIC);
    let content = saved.content.unwrap();
    assert!(content.contains(TOPIC));
    assert!(content.contains("Failed to extract any meaningful learnings"));
    assert_eq!(saved.sources, vec![Source::new("https://only-source.example")]);
}

#[tokio::test]
async fn test_draft_without_heading_keeps_topic() {
    let store = Arc::new(MemoryTaskStore::new());
    let task = pending_task(store.as_ref()).await;
    let search = ScriptedGenerator::text(&research_text());
    let writer = ScriptedGenerator::text("\n\nAn article with no heading at all.\n\n");

    workflow(store.clone(), search, writer)
        .run(&ArticleRequest::from(&task), &InlineStepRunner)
        .await
        .unwrap();

    let saved = store.get_by_id(&task.id).await.unwrap().unwrap();
    assert_eq!(saved.status, TaskStatus::Complete);
    assert_eq!(saved.topic, TOPIC);
    assert_eq!(
        saved.content.as_deref(),
        Some("An article with no heading at all.")
    );
}

#[tokio::test]
async fn test_empty_draft_completes_without_content() {
    let store = Arc::new(MemoryTaskStore::new());
    let task = pending_task(store.as_ref()).await;
    let search = ScriptedGenerator::grounded(&research_text(), grounding());
    let writer = ScriptedGenerator::text("");

    let outcome = workflow(store.clone(), search, writer.clone())
        .run(&ArticleRequest::from(&task), &InlineStepRunner)
        .await
        .unwrap();
    assert_eq!(writer.calls(), 1);
    assert!(outcome.body.is_empty());

    let saved = store.get_by_id(&task.id).await.unwrap().unwrap();
    assert_eq!(saved.status, TaskStatus::Complete);
    assert_eq!(saved.topic, TOPIC);
    assert_eq!(saved.content.as_deref(), Some(""));
    assert!(!saved.sources.is_empty());

    let progress = saved.poll_status();
    assert_eq!(progress.status, TaskStatus::Complete);
    assert!(!progress.has_content);
}

#[tokio::test]
async fn test_rerunning_success_is_idempotent() {
    let store = Arc::new(MemoryTaskStore::new());
    let task = pending_task(store.as_ref()).await;
    let request = ArticleRequest::from(&task);
    let flow = workflow(
        store.clone(),
        ScriptedGenerator::grounded(&research_text(), grounding()),
        ScriptedGenerator::text(DRAFT),
    );

    flow.run(&request, &InlineStepRunner).await.unwrap();
    let first = store.get_by_id(&task.id).await.unwrap().unwrap();

    flow.run(&request, &InlineStepRunner).await.unwrap();
    let second = store.get_by_id(&task.id).await.unwrap().unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_failure_at_each_step_records_best_content() {
    let cases = [
        (steps::GATHER, None, 0),
        (steps::EXTRACT, None, 0),
        (steps::WRITE, None, 3),
        (steps::SPLIT, Some(DRAFT.to_string()), 3),
        (
            steps::PERSIST,
            Some("Intro paragraph.\n\n## Roles\nDetails.".to_string()),
            3,
        ),
    ];

    for (step, expected_content, expected_sources) in cases {
        let store = Arc::new(MemoryTaskStore::new());
        let task = pending_task(store.as_ref()).await;
        let flow = workflow(
            store.clone(),
            ScriptedGenerator::grounded(&research_text(), grounding()),
            ScriptedGenerator::text(DRAFT),
        );

        let err = flow
            .run(&ArticleRequest::from(&task), &FailAtRunner { step })
            .await
            .unwrap_err();
        match &err {
            ArticleError::Step { step: failed, .. } => assert_eq!(failed, step),
            other => panic!("unexpected error at {}: {}", step, other),
        }

        let saved = store.get_by_id(&task.id).await.unwrap().unwrap();
        assert_eq!(saved.status, TaskStatus::Failed, "step {}", step);
        assert_eq!(saved.topic, TOPIC, "step {}", step);
        assert_eq!(saved.sources.len(), expected_sources, "step {}", step);

        let content = saved.content.unwrap();
        match expected_content {
            Some(expected) => assert_eq!(content, expected, "step {}", step),
            None => {
                assert!(content.starts_with("## Error Generating Article"));
                assert!(content.contains("injected failure"));
            }
        }
    }
}

#[tokio::test]
async fn test_writer_error_propagates() {
    let store = Arc::new(MemoryTaskStore::new());
    let task = pending_task(store.as_ref()).await;
    let flow = workflow(
        store.clone(),
        ScriptedGenerator::text(&research_text()),
        ScriptedGenerator::failing(ErrorCategory::Auth, "API key not valid"),
    );

    let err = flow
        .run(&ArticleRequest::from(&task), &InlineStepRunner)
        .await
        .unwrap_err();
    assert!(matches!(&err, ArticleError::Llm(e) if e.category == ErrorCategory::Auth));

    let saved = store.get_by_id(&task.id).await.unwrap().unwrap();
    assert_eq!(saved.status, TaskStatus::Failed);
    assert!(saved.content.unwrap().contains("API key not valid"));
}

#[tokio::test]
async fn test_failed_error_record_does_not_mask_original_error() {
    let store = Arc::new(BrokenStore::default());
    let task = pending_task(store.as_ref()).await;
    let flow = workflow(
        store.clone(),
        ScriptedGenerator::text("nothing"),
        ScriptedGenerator::text(DRAFT),
    );

    let err = flow
        .run(&ArticleRequest::from(&task), &InlineStepRunner)
        .await
        .unwrap_err();

    assert!(matches!(err, ArticleError::NoLearnings));
    assert_eq!(store.update_attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_success_persist_failure_is_fatal() {
    let store = Arc::new(BrokenStore::default());
    let task = pending_task(store.as_ref()).await;
    let flow = workflow(
        store.clone(),
        ScriptedGenerator::text(&research_text()),
        ScriptedGenerator::text(DRAFT),
    );

    let err = flow
        .run(&ArticleRequest::from(&task), &InlineStepRunner)
        .await
        .unwrap_err();

    assert!(matches!(err, ArticleError::Storage(_)));
    // success write, then the best-effort failure write
    assert_eq!(store.update_attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_terminal_conflict_on_success_path() {
    let store = Arc::new(MemoryTaskStore::new());
    let task = pending_task(store.as_ref()).await;
    store
        .update_by_id(
            &task.id,
            &TaskUpdate::failed("earlier failure".to_string(), vec![], TOPIC.to_string()),
        )
        .await
        .unwrap();

    let err = workflow(
        store.clone(),
        ScriptedGenerator::text(&research_text()),
        ScriptedGenerator::text(DRAFT),
    )
    .run(&ArticleRequest::from(&task), &InlineStepRunner)
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        ArticleError::TerminalConflict {
            current: TaskStatus::Failed,
            ..
        }
    ));
    let saved = store.get_by_id(&task.id).await.unwrap().unwrap();
    assert_eq!(saved.status, TaskStatus::Failed);
}

#[tokio::test]
async fn test_missing_task_is_reported() {
    let store = Arc::new(MemoryTaskStore::new());
    let request = ArticleRequest {
        id: "does-not-exist".to_string(),
        topic: TOPIC.to_string(),
        owner: "x".to_string(),
    };

    let err = workflow(
        store,
        ScriptedGenerator::text(&research_text()),
        ScriptedGenerator::text(DRAFT),
    )
    .run(&request, &InlineStepRunner)
    .await
    .unwrap_err();

    assert!(matches!(err, ArticleError::TaskNotFound(id) if id == "does-not-exist"));
}

#[tokio::test]
async fn test_durable_run_replays_checkpointed_research() {
    let db = Database::open_in_memory().unwrap();
    db.initialize().unwrap();
    let db = Arc::new(db);
    let store = Arc::new(SqliteTaskStore::new(db.clone()));
    let task = pending_task(store.as_ref()).await;

    let cached = GatherResult {
        text: research_text(),
        metadata: Some(grounding()),
    };
    db.store_step_checkpoint(
        &task.id,
        steps::GATHER,
        &serde_json::to_value(&cached).unwrap(),
        1,
    )
    .unwrap();

    let search = ScriptedGenerator::failing(ErrorCategory::Auth, "must not be called");
    let writer = ScriptedGenerator::text(DRAFT);
    let runner = DurableStepRunner::new(db.clone(), task.id.clone());

    let outcome = workflow(store.clone(), search.clone(), writer)
        .run(&ArticleRequest::from(&task), &runner)
        .await
        .unwrap();

    assert_eq!(search.calls(), 0);
    assert_eq!(outcome.sources.len(), 3);

    let saved = store.get_by_id(&task.id).await.unwrap().unwrap();
    assert_eq!(saved.status, TaskStatus::Complete);
    let completed: Vec<String> = db
        .list_step_checkpoints(&task.id)
        .unwrap()
        .into_iter()
        .map(|(name, _, _)| name)
        .collect();
    for step in [steps::GATHER, steps::EXTRACT, steps::WRITE, steps::SPLIT, steps::PERSIST] {
        assert!(completed.iter().any(|name| name == step), "missing {}", step);
    }
}

#[test]
fn test_extract_merges_metadata_sources() {
    let extraction = extract(&GatherResult {
        text: research_text(),
        metadata: Some(grounding()),
    });
    assert_eq!(extraction.learnings.len(), 2);
    assert_eq!(extraction.sources.len(), 3);
    assert_eq!(extraction.sources[1], Source::new("https://www.ascd.org/group-work"));
}
