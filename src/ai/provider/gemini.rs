//! Gemini API Provider
//!
//! Text generation through the Generative Language `generateContent`
//! endpoint. With search grounding enabled the `google_search` tool is
//! attached and the candidate's grounding metadata is returned alongside
//! the text. Requests can be routed through an AI Gateway.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{
    ErrorCategory, ErrorClassifier, Generation, GatewayRoute, LlmError, ModelInfo,
    ProviderConfig, ResponseTiming, TextGenerator, TokenUsage,
};
use crate::constants::network;
use crate::types::{ArticleError, Result};

const PROVIDER: &str = "gemini";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const GATEWAY_PROVIDER_PATH: &str = "google-ai-studio/v1beta";

/// Gemini provider with secure API key handling
pub struct GeminiProvider {
    api_key: SecretString,
    gateway_key: Option<SecretString>,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    search_grounding: bool,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_key", &"[REDACTED]")
            .field("gateway_key", &self.gateway_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("search_grounding", &self.search_grounding)
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ArticleError::Config(
                    "Gemini API key not found. Set GOOGLE_API_KEY or llm.api_key in config"
                        .to_string(),
                )
            })?;

        let api_base = match (&config.api_base, &config.gateway) {
            (Some(base), _) => Self::validate_endpoint(base)?,
            (None, Some(gateway)) => Self::validate_endpoint(&Self::gateway_base(gateway))?,
            (None, None) => network::GEMINI_API_BASE.to_string(),
        };

        let gateway_key = config
            .gateway
            .and_then(|gateway| gateway.api_key)
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ArticleError::Config(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            gateway_key,
            api_base,
            model: config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            search_grounding: config.search_grounding,
            client,
        })
    }

    /// Base URL for routing through the AI Gateway
    fn gateway_base(gateway: &GatewayRoute) -> String {
        format!(
            "{}/{}/{}/{}",
            network::AI_GATEWAY_BASE,
            gateway.account_id,
            gateway.name,
            GATEWAY_PROVIDER_PATH
        )
    }

    /// Only http/https endpoints are accepted; trailing slash is removed.
    fn validate_endpoint(endpoint: &str) -> Result<String> {
        let url = url::Url::parse(endpoint).map_err(|e| {
            ArticleError::Config(format!("Invalid Gemini endpoint URL '{}': {}", endpoint, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ArticleError::Config(format!(
                "Gemini endpoint must use http or https scheme, got: {}",
                url.scheme()
            )));
        }

        let mut result = url.to_string();
        if result.ends_with('/') {
            result.pop();
        }
        Ok(result)
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    fn build_request(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
            tools: self
                .search_grounding
                .then(|| vec![json!({ "google_search": {} })]),
        }
    }

    fn transport_error(err: reqwest::Error) -> LlmError {
        if err.is_timeout() || err.is_connect() {
            LlmError::with_provider(
                ErrorCategory::Network,
                format!("Gemini request failed: {}", err),
                PROVIDER,
            )
        } else {
            ErrorClassifier::classify(&format!("Gemini request failed: {}", err), PROVIDER)
        }
    }

    fn parse_response(
        &self,
        body: GenerateContentResponse,
        elapsed: Duration,
    ) -> std::result::Result<Generation, LlmError> {
        let usage = body
            .usage_metadata
            .map(|u| TokenUsage::from_gemini(u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        let Some(candidate) = body.candidates.into_iter().next() else {
            let reason = body
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(LlmError::with_provider(
                ErrorCategory::BadRequest,
                format!("Gemini returned no content: {}", reason),
                PROVIDER,
            ));
        };

        // Thinking models return their reasoning as separate `thought` parts.
        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter(|part| !part.thought)
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            warn!(
                "Gemini returned empty text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            );
        }

        let mut metadata = serde_json::Map::new();
        if let Some(grounding) = candidate.grounding_metadata {
            metadata.insert("groundingMetadata".to_string(), grounding);
        }
        if let Some(ratings) = candidate.safety_ratings {
            metadata.insert("safetyRatings".to_string(), ratings);
        }

        Ok(Generation {
            text,
            metadata: (!metadata.is_empty()).then_some(Value::Object(metadata)),
            usage,
            timing: ResponseTiming::from_duration(elapsed),
            model: ModelInfo {
                model: self.model.clone(),
                provider: PROVIDER.to_string(),
            },
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<Generation> {
        info!(
            "Generating with Gemini (model: {}, grounding: {})",
            self.model, self.search_grounding
        );

        let start_time = Instant::now();
        let request = self.build_request(prompt);

        let mut builder = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(gateway_key) = &self.gateway_key {
            builder = builder.header(
                "cf-aig-authorization",
                format!("Bearer {}", gateway_key.expose_secret()),
            );
        }

        debug!("Sending request to Gemini API");
        let response = builder.send().await.map_err(Self::transport_error)?;

        let elapsed = start_time.elapsed();

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini API error ({}) for model {}", status, self.model);
            return Err(ErrorClassifier::classify_http_status(
                status.as_u16(),
                &format!("Gemini API error ({}): {}", status, body),
                PROVIDER,
            )
            .into());
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            LlmError::with_provider(
                ErrorCategory::ParseError,
                format!("Failed to parse Gemini response: {}", e),
                PROVIDER,
            )
        })?;

        let generation = self.parse_response(body, elapsed)?;
        debug!(
            "Gemini response: {} chars, {} tokens",
            generation.text.len(),
            generation.usage.total()
        );
        Ok(generation)
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
    grounding_metadata: Option<Value>,
    safety_ratings: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}
