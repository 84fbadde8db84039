//! AI client: the single point of entry for embedding and chat-completion calls.
//!
//! No other module talks to Bedrock or OpenAI directly. Callers hold an
//! `Arc<dyn AiService>` chosen once at startup from `USE_OPENAI`.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::Config;

pub mod bedrock;
pub mod openai;
pub mod prompts;

pub use bedrock::BedrockClient;
pub use openai::OpenAiClient;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("AI service returned empty content")]
    EmptyContent,

    #[error("OPENAI_API_KEY is not configured")]
    MissingApiKey,
}

/// One chat-completion call: a system prompt and a single user turn.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    /// Ask the provider for a bare JSON object where it supports it.
    pub json_output: bool,
}

impl<'a> CompletionRequest<'a> {
    pub fn text(system: &'a str, prompt: &'a str) -> Self {
        Self {
            system,
            prompt,
            json_output: false,
        }
    }

    pub fn json(system: &'a str, prompt: &'a str) -> Self {
        Self {
            system,
            prompt,
            json_output: true,
        }
    }
}

#[async_trait]
pub trait AiService: Send + Sync {
    /// Embedding vector for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError>;

    /// Text of the model's reply.
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, AiError>;

    /// Provider name for logging ("bedrock" | "openai").
    fn name(&self) -> &str;

    /// Chat model identifier.
    fn model(&self) -> &str;
}

/// Picks the provider from configuration. Bedrock shares the AWS SDK config
/// loaded for S3.
pub fn build_ai_service(
    config: &Config,
    sdk_config: &aws_config::SdkConfig,
) -> Result<Arc<dyn AiService>, AiError> {
    let service: Arc<dyn AiService> = if config.use_openai {
        let api_key = config.openai_api_key.clone().ok_or(AiError::MissingApiKey)?;
        Arc::new(OpenAiClient::new(
            api_key,
            config.openai_base_url.clone(),
            config.openai_model.clone(),
            config.openai_embedding_model.clone(),
        )?)
    } else {
        Arc::new(BedrockClient::new(
            aws_sdk_bedrockruntime::Client::new(sdk_config),
            config.bedrock_model_id.clone(),
            config.bedrock_embedding_model.clone(),
        ))
    };
    info!(
        "AI service initialized (provider: {}, model: {})",
        service.name(),
        service.model()
    );
    Ok(service)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped
                .strip_suffix("```")
                .map(str::trim)
                .unwrap_or(stripped)
        }
        None => text,
    }
}

/// Cuts the outermost `{ ... }` span out of a reply that may carry prose
/// around the JSON object.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
