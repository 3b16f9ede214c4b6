//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (platform config dir) and project (.articlegen/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::ai::provider::{GatewayRoute, ProviderConfig};
use crate::constants::{network, retry};
use crate::types::{ArticleError, Result};
use crate::workflow::RetryPolicy;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Gemini provider settings
    pub llm: LlmConfig,

    /// Task database settings
    pub storage: StorageConfig,

    /// Step retry and timeout settings
    pub workflow: WorkflowConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            storage: StorageConfig::default(),
            workflow: WorkflowConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `ArticleError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ArticleError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(ArticleError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.llm.max_tokens == 0 {
            return Err(ArticleError::Config(
                "LLM max_tokens must be greater than 0".to_string(),
            ));
        }

        if self.llm.search_model.trim().is_empty() || self.llm.writer_model.trim().is_empty() {
            return Err(ArticleError::Config(
                "LLM search_model and writer_model must not be empty".to_string(),
            ));
        }

        if let Some(gateway) = &self.llm.gateway
            && (gateway.account_id.is_empty() || gateway.name.is_empty())
        {
            return Err(ArticleError::Config(
                "Gateway requires both account_id and name".to_string(),
            ));
        }

        if self.workflow.step_timeout_secs == 0 {
            return Err(ArticleError::Config(
                "Workflow step_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.workflow.retry_base_delay_ms > self.workflow.retry_max_delay_secs * 1000 {
            return Err(ArticleError::Config(format!(
                "Workflow retry_base_delay_ms ({}) exceeds retry_max_delay_secs ({})",
                self.workflow.retry_base_delay_ms, self.workflow.retry_max_delay_secs
            )));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

pub const DEFAULT_SEARCH_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_WRITER_MODEL: &str = "gemini-2.0-flash-thinking-exp-01-21";

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Google AI Studio key (falls back to GOOGLE_API_KEY)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Custom API base URL
    pub api_base: Option<String>,

    /// Model used for grounded research
    pub search_model: String,

    /// Model used to draft the article
    pub writer_model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for generation
    pub temperature: f32,

    /// Maximum output tokens per request
    pub max_tokens: usize,

    /// Optional AI Gateway routing
    pub gateway: Option<GatewayRoute>,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("search_model", &self.search_model)
            .field("writer_model", &self.writer_model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("gateway", &self.gateway)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: None,
            search_model: DEFAULT_SEARCH_MODEL.to_string(),
            writer_model: DEFAULT_WRITER_MODEL.to_string(),
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.7,
            max_tokens: 8192,
            gateway: None,
        }
    }
}

impl LlmConfig {
    fn provider_config(&self, model: &str, search_grounding: bool) -> ProviderConfig {
        ProviderConfig {
            provider: "gemini".to_string(),
            model: Some(model.to_string()),
            timeout_secs: self.timeout_secs,
            temperature: self.temperature,
            api_key: self.api_key.clone(),
            api_base: self.api_base.clone(),
            max_tokens: self.max_tokens,
            search_grounding,
            gateway: self.gateway.clone(),
        }
    }

    /// Provider settings for the research step (search grounding on)
    pub fn search_provider_config(&self) -> ProviderConfig {
        self.provider_config(&self.search_model, true)
    }

    /// Provider settings for the drafting step
    pub fn writer_provider_config(&self) -> ProviderConfig {
        self.provider_config(&self.writer_model, false)
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path (defaults to .articlegen/articlegen.db)
    pub database_path: Option<PathBuf>,
}

// =============================================================================
// Workflow Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Retries after the first attempt of a step
    pub step_retries: usize,

    /// First backoff delay in milliseconds
    pub retry_base_delay_ms: u64,

    /// Longest wait between retries in seconds
    pub retry_max_delay_secs: u64,

    /// Timeout for a single step attempt in seconds
    pub step_timeout_secs: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            step_retries: retry::DEFAULT_STEP_RETRIES,
            retry_base_delay_ms: retry::BASE_DELAY_MS,
            retry_max_delay_secs: retry::MAX_DELAY_SECS,
            step_timeout_secs: retry::STEP_TIMEOUT_SECS,
        }
    }
}

impl WorkflowConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.step_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_secs(self.retry_max_delay_secs),
            step_timeout: Duration::from_secs(self.step_timeout_secs),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.llm.search_model, "gemini-2.0-flash");
        assert_eq!(config.llm.writer_model, "gemini-2.0-flash-thinking-exp-01-21");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_provider_configs() {
        let llm = LlmConfig {
            api_key: Some("key".to_string()),
            ..Default::default()
        };

        let search = llm.search_provider_config();
        assert!(search.search_grounding);
        assert_eq!(search.model.as_deref(), Some(DEFAULT_SEARCH_MODEL));
        assert_eq!(search.api_key.as_deref(), Some("key"));

        let writer = llm.writer_provider_config();
        assert!(!writer.search_grounding);
        assert_eq!(writer.model.as_deref(), Some(DEFAULT_WRITER_MODEL));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.llm.temperature = 3.0;
        assert!(matches!(config.validate(), Err(ArticleError::Config(_))));

        let mut config = Config::default();
        config.workflow.step_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.workflow.retry_base_delay_ms = 120_000;
        config.workflow.retry_max_delay_secs = 60;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.llm.gateway = Some(GatewayRoute {
            account_id: "acct".to_string(),
            name: String::new(),
            api_key: None,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_never_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("super-secret".to_string());

        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(!toml.contains("super-secret"));
        assert!(!format!("{:?}", config).contains("super-secret"));
    }

    #[test]
    fn test_retry_policy_from_workflow() {
        let policy = WorkflowConfig {
            step_retries: 2,
            retry_base_delay_ms: 250,
            retry_max_delay_secs: 4,
            step_timeout_secs: 30,
        }
        .retry_policy();

        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        assert_eq!(policy.max_delay, Duration::from_secs(4));
        assert_eq!(policy.step_timeout, Duration::from_secs(30));
    }
}
