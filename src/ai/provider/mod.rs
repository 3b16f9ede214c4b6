//! Text Generation Provider Abstraction
//!
//! Defines the TextGenerator trait used by both workflow generation steps.
//! Every provider returns a `Generation` carrying the raw text, the
//! provider's grounding metadata when present, and usage metrics.
//!
//! ## Modules
//!
//! - `gemini`: Google Generative Language API, optionally behind AI Gateway
//! - `grounding`: Tolerant reader for search grounding metadata

mod gemini;
pub mod grounding;

pub use gemini::GeminiProvider;
pub use grounding::{SearchMetadata, extract_search_metadata};

// Re-export error types from centralized location
pub use crate::types::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::types::{ArticleError, Result};

// =============================================================================
// Generation with Usage Metrics
// =============================================================================

/// Complete generation result including text, grounding metadata and metrics
#[derive(Debug, Clone)]
pub struct Generation {
    /// Generated text
    pub text: String,
    /// Provider-specific metadata (grounding, safety ratings)
    pub metadata: Option<Value>,
    /// Token usage metrics
    pub usage: TokenUsage,
    /// Response timing
    pub timing: ResponseTiming,
    /// Provider and model info
    pub model: ModelInfo,
}

impl Generation {
    /// Create a generation with text only (usage/metadata unknown)
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: None,
            usage: TokenUsage::default(),
            timing: ResponseTiming::default(),
            model: ModelInfo::default(),
        }
    }

    /// Attach provider metadata
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Token usage metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens (prompt)
    pub input_tokens: u32,
    /// Output tokens (response)
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used (input + output)
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    /// Create from Gemini-style `usageMetadata`
    pub fn from_gemini(prompt_token_count: u32, candidates_token_count: u32) -> Self {
        Self {
            input_tokens: prompt_token_count,
            output_tokens: candidates_token_count,
        }
    }
}

/// Response timing metrics
#[derive(Debug, Clone, Default)]
pub struct ResponseTiming {
    /// Total response time in milliseconds (wall clock)
    pub total_ms: u64,
}

impl ResponseTiming {
    pub fn from_duration(duration: std::time::Duration) -> Self {
        Self {
            total_ms: duration.as_millis() as u64,
        }
    }
}

/// Which provider and model produced a generation
#[derive(Debug, Clone, Default)]
pub struct ModelInfo {
    /// Model used
    pub model: String,
    /// Provider name
    pub provider: String,
}

/// Shared generator type, one per workflow role.
pub type SharedGenerator = Arc<dyn TextGenerator + Send + Sync>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// AI Gateway routing for provider requests
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct GatewayRoute {
    pub account_id: String,
    pub name: String,
    /// Gateway token, sent as `cf-aig-authorization`
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for GatewayRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayRoute")
            .field("account_id", &self.account_id)
            .field("name", &self.name)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Configuration for one generation provider
///
/// Note: API keys are never serialized and are redacted in debug output.
/// Providers convert them to SecretString internally.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider type: "gemini"
    pub provider: String,
    /// Model name (provider-specific)
    pub model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Temperature for generation
    pub temperature: f32,
    /// Provider API key
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL (for custom endpoints)
    #[serde(default)]
    pub api_base: Option<String>,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Enable search grounding for this provider
    #[serde(default)]
    pub search_grounding: bool,
    /// Optional AI Gateway routing
    #[serde(default)]
    pub gateway: Option<GatewayRoute>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .field("search_grounding", &self.search_grounding)
            .field("gateway", &self.gateway)
            .finish()
    }
}

fn default_max_tokens() -> usize {
    8192
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: None,
            timeout_secs: crate::constants::network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.7,
            api_key: None,
            api_base: None,
            max_tokens: default_max_tokens(),
            search_grounding: false,
            gateway: None,
        }
    }
}

// =============================================================================
// Text Generator Trait
// =============================================================================

/// Text generation capability used by the workflow steps
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate free-form text for a prompt
    async fn generate(&self, prompt: &str) -> Result<Generation>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;
}

/// Create a shared generator from configuration
pub fn create_generator(config: &ProviderConfig) -> Result<SharedGenerator> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiProvider::new(config.clone())?)),
        _ => Err(ArticleError::Config(format!(
            "Unknown provider: {}. Supported: gemini",
            config.provider
        ))),
    }
}
