//! Article Generation Workflow
//!
//! Turns a topic into a finished article plus a deduplicated source list.
//!
//! ## Pipeline Architecture
//!
//! ```text
//! gather information → extract learnings → write article → split title → persist article
//!      (search)         (parser + sources)     (writer)      (splitter)     (task store)
//! ```
//!
//! Every step runs through a [`StepRunner`] under a stable name, so a durable
//! runner can replay completed steps when a run is resumed.
//!
//! ## Failure Handling
//!
//! Any failing step ends the run. Before the error is returned, the task is
//! moved to `Failed` with the best content produced so far: the split body,
//! else the raw draft, else a generated error report. Failing to write that
//! record is logged and never replaces the original error.

pub mod parser;
pub mod sources;
pub mod splitter;
pub mod step;
pub mod types;

#[cfg(test)]
mod tests;

pub use parser::{ParsedResearch, extract_learnings, fallback_learnings, parse_learnings_and_sources};
pub use sources::reconcile;
pub use splitter::{SplitDocument, split_title};
pub use step::{DurableStepRunner, InlineStepRunner, RetryPolicy, StepFn, StepRunner, run_typed};
pub use types::{ArticleRequest, Extraction, GatherResult, RunOutcome, RunState, error_report};

use tracing::{debug, error, info, instrument, warn};

use crate::ai::prompt::{PromptTemplates, current_date};
use crate::ai::provider::{SharedGenerator, extract_search_metadata};
use crate::constants::steps;
use crate::storage::SharedTaskStore;
use crate::types::{ArticleError, Result, TaskUpdate, UpdateOutcome};

/// Parse research text and merge its sources with grounding metadata.
pub fn extract(gathered: &GatherResult) -> Extraction {
    let parsed = parse_learnings_and_sources(&gathered.text);
    let learnings = extract_learnings(&gathered.text, &parsed);
    let metadata = extract_search_metadata(gathered.metadata.as_ref());

    if !metadata.safety_ratings.is_empty() {
        debug!("Grounding returned {} safety ratings", metadata.safety_ratings.len());
    }

    Extraction {
        learnings,
        sources: reconcile(&parsed.sources, &metadata.sources),
        search_queries: metadata.search_queries,
    }
}

/// Orchestrates one article run against a task store and two generators.
pub struct ArticleWorkflow {
    store: SharedTaskStore,
    search: SharedGenerator,
    writer: SharedGenerator,
}

impl ArticleWorkflow {
    pub fn new(store: SharedTaskStore, search: SharedGenerator, writer: SharedGenerator) -> Self {
        Self {
            store,
            search,
            writer,
        }
    }

    /// Run the workflow, recording a `Failed` task on error.
    ///
    /// The returned error is always the one that ended the run.
    #[instrument(skip(self, request, runner), fields(task_id = %request.id))]
    pub async fn run(
        &self,
        request: &ArticleRequest,
        runner: &dyn StepRunner,
    ) -> Result<RunOutcome> {
        let mut state = RunState::default();

        match self.execute(request, runner, &mut state).await {
            Ok(outcome) => {
                info!(
                    "Article complete: \"{}\" ({} sources)",
                    outcome.title,
                    outcome.sources.len()
                );
                Ok(outcome)
            }
            Err(e) => {
                self.record_failure(request, &state, &e).await;
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        request: &ArticleRequest,
        runner: &dyn StepRunner,
        state: &mut RunState,
    ) -> Result<RunOutcome> {
        let date = current_date();
        let date = date.as_str();
        let topic = request.topic.as_str();
        let task_id = request.id.as_str();

        // 1. Research
        let search = self.search.as_ref();
        let gathered: GatherResult = run_typed(runner, steps::GATHER, move || async move {
            let generation = search
                .generate(&PromptTemplates::research(topic, date))
                .await?;
            Ok(GatherResult {
                text: generation.text,
                metadata: generation.metadata,
            })
        })
        .await?;
        info!("Gathered {} chars of research", gathered.text.len());

        // 2. Extraction
        let gathered = &gathered;
        let extraction: Extraction =
            run_typed(runner, steps::EXTRACT, move || async move { Ok(extract(gathered)) }).await?;

        state.sources = extraction.sources.clone();
        state.learnings = extraction.learnings.clone();
        info!(
            "Extracted {} learnings and {} sources",
            extraction.learnings.len(),
            extraction.sources.len()
        );
        if extraction.learnings.is_empty() {
            return Err(ArticleError::NoLearnings);
        }

        // 3. Drafting
        let writer = self.writer.as_ref();
        let learnings = extraction.learnings.as_slice();
        let draft: String = run_typed(runner, steps::WRITE, move || async move {
            if learnings.is_empty() {
                return Err(ArticleError::MissingLearnings);
            }
            let generation = writer
                .generate(&PromptTemplates::article(topic, learnings, date))
                .await?;
            Ok(generation.text)
        })
        .await?;
        state.draft = Some(draft.clone());

        // 4. Title split
        let draft_ref = draft.as_str();
        let document: SplitDocument = run_typed(runner, steps::SPLIT, move || async move {
            Ok(split_title(draft_ref, topic))
        })
        .await?;
        state.document = Some(document.clone());
        if document.body.is_empty() {
            warn!("Draft has no body below its title");
        }

        // 5. Persist
        let store = self.store.as_ref();
        let update = TaskUpdate::complete(
            document.body.clone(),
            extraction.sources.clone(),
            document.title.clone(),
        );
        let update = &update;
        run_typed(runner, steps::PERSIST, move || async move {
            match store.update_by_id(task_id, update).await? {
                UpdateOutcome::Applied => Ok(()),
                UpdateOutcome::NotFound => Err(ArticleError::TaskNotFound(task_id.to_string())),
                UpdateOutcome::Rejected { current } => Err(ArticleError::TerminalConflict {
                    id: task_id.to_string(),
                    current,
                }),
            }
        })
        .await?;

        Ok(RunOutcome {
            task_id: request.id.clone(),
            title: document.title,
            body: document.body,
            sources: extraction.sources,
            learnings_count: extraction.learnings.len(),
            search_queries: extraction.search_queries,
        })
    }

    /// Best-effort `Failed` record; never fails.
    async fn record_failure(&self, request: &ArticleRequest, state: &RunState, err: &ArticleError) {
        error!("Workflow failed for task {}: {}", request.id, err);
        info!(
            learnings = state.learnings.len(),
            sources = state.sources.len(),
            has_draft = state.draft.is_some(),
            "Partial state at failure"
        );

        let update = state.failure_update(&request.topic, &err.to_string());
        match self.store.update_by_id(&request.id, &update).await {
            Ok(UpdateOutcome::Applied) => info!("Recorded failure for task {}", request.id),
            Ok(UpdateOutcome::NotFound) => {
                error!("Cannot record failure: task {} not found", request.id)
            }
            Ok(UpdateOutcome::Rejected { current }) => warn!(
                "Task {} already {}; failure record not written",
                request.id, current
            ),
            Err(store_err) => error!(
                "Failed to record failure for task {}: {}. Original error: {}",
                request.id, store_err, err
            ),
        }
    }
}
