//! Step Execution Substrate
//!
//! The workflow hands each named step to a [`StepRunner`]. Steps are plain
//! closures producing JSON so a runner can persist and replay their output.
//!
//! ## Runners
//!
//! - [`InlineStepRunner`]: runs each step once, nothing persisted
//! - [`DurableStepRunner`]: replays checkpointed outputs, otherwise runs the
//!   step under a timeout with exponential backoff and checkpoints the result

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::ai::timeout::with_timeout;
use crate::constants::retry as retry_constants;
use crate::storage::SharedDatabase;
use crate::types::{ArticleError, Result};

/// A re-runnable step body producing its JSON output.
pub type StepFn<'a> = Box<dyn Fn() -> BoxFuture<'a, Result<Value>> + Send + Sync + 'a>;

/// Executes named workflow steps.
#[async_trait]
pub trait StepRunner: Send + Sync {
    /// Run `step` under `name`, which is stable across re-executions of a run.
    async fn run_step<'a>(&self, name: &str, step: StepFn<'a>) -> Result<Value>;
}

/// Run a step whose output is a serializable type.
pub async fn run_typed<'a, T, F, Fut>(runner: &dyn StepRunner, name: &str, f: F) -> Result<T>
where
    T: Serialize + DeserializeOwned + Send + 'a,
    F: Fn() -> Fut + Send + Sync + 'a,
    Fut: Future<Output = Result<T>> + Send + 'a,
{
    let step: StepFn<'a> = Box::new(move || {
        let fut = f();
        Box::pin(async move {
            let output = fut.await?;
            Ok(serde_json::to_value(output)?)
        })
    });

    let value = runner.run_step(name, step).await?;
    Ok(serde_json::from_value(value)?)
}

// =============================================================================
// Inline Runner
// =============================================================================

/// Runs every step exactly once with no persistence.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineStepRunner;

#[async_trait]
impl StepRunner for InlineStepRunner {
    async fn run_step<'a>(&self, name: &str, step: StepFn<'a>) -> Result<Value> {
        info!(step = name, "Running step");
        step().await
    }
}

// =============================================================================
// Durable Runner
// =============================================================================

/// Retry and timeout policy for durable steps
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Timeout for a single attempt
    pub step_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: retry_constants::DEFAULT_STEP_RETRIES,
            base_delay: Duration::from_millis(retry_constants::BASE_DELAY_MS),
            max_delay: Duration::from_secs(retry_constants::MAX_DELAY_SECS),
            step_timeout: Duration::from_secs(retry_constants::STEP_TIMEOUT_SECS),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
            .with_jitter()
    }

    /// Wait at least as long as the error asks for, within `max_delay`.
    fn adjust_delay(&self, error: &ArticleError, delay: Duration) -> Duration {
        error
            .retry_hint()
            .map_or(delay, |hint| hint.max(delay))
            .min(self.max_delay)
    }
}

/// SQLite-checkpointed step runner for one task.
pub struct DurableStepRunner {
    db: SharedDatabase,
    task_id: String,
    policy: RetryPolicy,
}

impl DurableStepRunner {
    pub fn new(db: SharedDatabase, task_id: impl Into<String>) -> Self {
        Self {
            db,
            task_id: task_id.into(),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }
}

#[async_trait]
impl StepRunner for DurableStepRunner {
    #[instrument(skip(self, step), fields(task_id = %self.task_id))]
    async fn run_step<'a>(&self, name: &str, step: StepFn<'a>) -> Result<Value> {
        if let Some(checkpoint) = self.db.load_step_checkpoint(&self.task_id, name)? {
            info!(
                step = name,
                completed_at = %checkpoint.completed_at,
                "Replaying checkpointed step"
            );
            return Ok(checkpoint.output);
        }

        let counter = AtomicU32::new(0);
        let attempts = &counter;
        let policy = &self.policy;
        let step = &step;

        let output = (move || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            info!(step = name, attempt, "Running step");
            with_timeout(policy.step_timeout, step(), name).await
        })
        .retry(policy.backoff())
        .sleep(tokio::time::sleep)
        .when(|e: &ArticleError| e.is_recoverable())
        .adjust(|e: &ArticleError, delay: Option<Duration>| {
            delay.map(|d| policy.adjust_delay(e, d))
        })
        .notify(|e: &ArticleError, delay: Duration| {
            warn!(step = name, "Step failed, retrying in {:?}: {}", delay, e);
        })
        .await?;

        self.db.store_step_checkpoint(
            &self.task_id,
            name,
            &output,
            counter.load(Ordering::SeqCst),
        )?;
        Ok(output)
    }
}
