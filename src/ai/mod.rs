//! AI Integration Layer
//!
//! Gemini text generation, prompt construction and timeouts for the
//! research and writing steps.

pub mod prompt;
pub mod provider;
pub mod timeout;

pub use prompt::{PromptBuilder, PromptSection, PromptTemplates, current_date, format_date};
pub use provider::{
    ErrorCategory, ErrorClassifier, GatewayRoute, GeminiProvider, Generation, LlmError, ModelInfo,
    ProviderConfig, ResponseTiming, SearchMetadata, SharedGenerator, TextGenerator, TokenUsage,
    create_generator, extract_search_metadata,
};
pub use timeout::with_timeout;
