//! OpenAI Chat Completions API

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use super::transport::{Transport, headers};
use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, StopReason, TokenUsage};
use crate::config::LlmConfig;

fn transient(status: u16) -> bool {
    matches!(status, 408 | 500 | 502 | 503 | 504)
}

/// Reasoning models reject `temperature` and take `max_completion_tokens`
fn is_reasoning_model(model: &str) -> bool {
    ["gpt-5", "o1", "o3", "o4"].iter().any(|prefix| model.starts_with(prefix))
}

#[derive(Debug, Clone)]
struct Wire {
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl Wire {
    /// The system prompt travels as the first chat message
    fn body(&self, request: &CompletionRequest) -> Value {
        let system = json!({ "role": "system", "content": request.system_prompt });
        let messages: Vec<Value> = std::iter::once(system)
            .chain(
                request
                    .messages
                    .iter()
                    .map(|m| json!({ "role": m.role, "content": m.content })),
            )
            .collect();

        let limit = request.max_tokens.min(self.max_tokens);
        let mut body = json!({ "model": self.model, "messages": messages });
        if is_reasoning_model(&self.model) {
            body["max_completion_tokens"] = json!(limit);
        } else {
            body["max_tokens"] = json!(limit);
            body["temperature"] = json!(request.temperature.unwrap_or(self.temperature));
        }
        body
    }
}

/// GPT models over Chat Completions
pub struct OpenAIClient {
    wire: Wire,
    transport: Transport,
}

impl OpenAIClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "OpenAIClient::from_config: called");
        let key = config.api_key().map_err(|e| LlmError::MissingApiKey(e.to_string()))?;
        let bearer = format!("Bearer {key}");
        let url = format!("{}/v1/chat/completions", config.base_url.trim_end_matches('/'));
        let fixed = headers(&[("authorization", bearer.as_str()), ("content-type", "application/json")])?;

        Ok(Self {
            wire: Wire {
                model: config.model.clone(),
                max_tokens: config.max_tokens,
                temperature: config.temperature,
            },
            transport: Transport::new(url, fixed, Duration::from_millis(config.timeout_ms), transient)?,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(model = %self.wire.model, max_tokens = request.max_tokens, "OpenAIClient::complete: called");
        let reply: ChatReply = self.transport.post(&self.wire.body(&request)).await?;
        Ok(reply.into())
    }
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

impl From<ChatReply> for CompletionResponse {
    fn from(reply: ChatReply) -> Self {
        let first = reply.choices.into_iter().next();
        let stop_reason = StopReason::from_openai(first.as_ref().and_then(|c| c.finish_reason.as_deref()));
        Self {
            content: first.and_then(|c| c.message.content),
            stop_reason,
            usage: reply
                .usage
                .map(|u| TokenUsage {
                    input_tokens: u.prompt_tokens,
                    output_tokens: u.completion_tokens,
                })
                .unwrap_or_default(),
        }
    }
}
