use async_trait::async_trait;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client as BedrockClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{AnalyzerError, Result};

pub mod prompts;

/// Anthropic message API version accepted by Bedrock
pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Fixed decoding parameters shared by every prompt
pub const MAX_TOKENS: u32 = 2048;
pub const TEMPERATURE: f64 = 0.5;
pub const TOP_P: f64 = 0.9;

/// Synchronous "prompt in, bytes out" model endpoint
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Invoke `model_id` with a JSON request body and return the raw JSON reply
    async fn invoke(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>>;
}

/// Bedrock runtime endpoint
pub struct BedrockModel {
    client: BedrockClient,
}

impl BedrockModel {
    pub fn new(client: BedrockClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LanguageModel for BedrockModel {
    async fn invoke(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>> {
        let response = self
            .client
            .invoke_model()
            .model_id(model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|err| {
                AnalyzerError::transport("Bedrock invocation failed", DisplayErrorContext(&err))
            })?;

        Ok(response.body.into_inner())
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    anthropic_version: &'static str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
    temperature: f64,
    top_p: f64,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

/// Prompt-level client bound to one deployment identifier
#[derive(Clone)]
pub struct ModelClient {
    model: Arc<dyn LanguageModel>,
    deployment_id: Option<String>,
}

impl ModelClient {
    pub fn new(model: Arc<dyn LanguageModel>, deployment_id: Option<String>) -> Self {
        Self {
            model,
            deployment_id,
        }
    }

    /// Send a single user prompt and return the text of the first content block
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let model_id = self
            .deployment_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                AnalyzerError::Configuration(
                    "INFERENCE_PROFILE_ARN environment variable is not set".to_string(),
                )
            })?;

        let request = MessagesRequest {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: MAX_TOKENS,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            top_p: TOP_P,
        };
        let body = serde_json::to_vec(&request)
            .map_err(|e| AnalyzerError::transport("Failed to encode model request", e))?;

        tracing::debug!(model_id, prompt_chars = prompt.len(), "Invoking hosted model");
        let reply = self.model.invoke(model_id, body).await?;

        let response: MessagesResponse = serde_json::from_slice(&reply)
            .map_err(|e| AnalyzerError::transport("Failed to decode model reply", e))?;

        response
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .ok_or_else(|| {
                AnalyzerError::transport("Failed to decode model reply", "no text content")
            })
    }
}

/// Model reply body carrying `text` as its only content block
#[cfg(test)]
pub(crate) fn reply_with_text(text: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn"
    }))
    .unwrap()
}
