//! Amazon Bedrock: Titan embeddings and Anthropic chat models via `InvokeModel`.

use async_trait::async_trait;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use super::{AiError, AiService, CompletionRequest};

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const MAX_TOKENS: u32 = 1000;

#[derive(Debug, Serialize)]
struct TitanEmbeddingRequest<'a> {
    #[serde(rename = "inputText")]
    input_text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TitanEmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    anthropic_version: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "is_blank")]
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

fn is_blank(s: &&str) -> bool {
    s.trim().is_empty()
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicResponse {
    /// Text of the first text block.
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Clone)]
pub struct BedrockClient {
    client: Client,
    model_id: String,
    embedding_model: String,
}

impl BedrockClient {
    pub fn new(client: Client, model_id: String, embedding_model: String) -> Self {
        Self {
            client,
            model_id,
            embedding_model,
        }
    }

    async fn invoke<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        model_id: &str,
        body: &B,
    ) -> Result<R, AiError> {
        let output = self
            .client
            .invoke_model()
            .model_id(model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(serde_json::to_vec(body)?))
            .send()
            .await
            .map_err(|e| {
                AiError::Provider(format!(
                    "Bedrock InvokeModel ({model_id}) failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        Ok(serde_json::from_slice(output.body().as_ref())?)
    }
}

#[async_trait]
impl AiService for BedrockClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        let response: TitanEmbeddingResponse = self
            .invoke(&self.embedding_model, &TitanEmbeddingRequest { input_text: text })
            .await?;
        if response.embedding.is_empty() {
            return Err(AiError::EmptyContent);
        }
        Ok(response.embedding)
    }

    /// Bedrock has no JSON mode; the prompt carries the JSON instruction and
    /// callers cut the object out of the reply.
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, AiError> {
        let body = AnthropicRequest {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: MAX_TOKENS,
            system: request.system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: request.prompt,
            }],
        };

        let response: AnthropicResponse = self.invoke(&self.model_id, &body).await?;

        if let Some(usage) = &response.usage {
            debug!(
                "Bedrock call succeeded: input_tokens={}, output_tokens={}",
                usage.input_tokens, usage.output_tokens
            );
        }

        response
            .text()
            .map(str::to_string)
            .ok_or(AiError::EmptyContent)
    }

    fn name(&self) -> &str {
        "bedrock"
    }

    fn model(&self) -> &str {
        &self.model_id
    }
}
