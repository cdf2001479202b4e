//! Anthropic Messages API

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use super::transport::{Transport, headers};
use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, StopReason, TokenUsage};
use crate::config::LlmConfig;

const API_VERSION: &str = "2023-06-01";

/// 529 is Anthropic's "overloaded"
fn transient(status: u16) -> bool {
    matches!(status, 408 | 500 | 502 | 503 | 504 | 529)
}

/// Model-side settings that shape the request body
#[derive(Debug, Clone)]
struct Wire {
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl Wire {
    fn body(&self, request: &CompletionRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| json!({ "role": m.role, "content": m.content }))
            .collect();
        json!({
            "model": self.model,
            "system": request.system_prompt,
            "messages": messages,
            "max_tokens": request.max_tokens.min(self.max_tokens),
            "temperature": request.temperature.unwrap_or(self.temperature),
        })
    }
}

/// Claude over the Messages endpoint
pub struct AnthropicClient {
    wire: Wire,
    transport: Transport,
}

impl AnthropicClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "AnthropicClient::from_config: called");
        let key = config.api_key().map_err(|e| LlmError::MissingApiKey(e.to_string()))?;
        let url = format!("{}/v1/messages", config.base_url.trim_end_matches('/'));
        let fixed = headers(&[
            ("x-api-key", key.as_str()),
            ("anthropic-version", API_VERSION),
            ("content-type", "application/json"),
        ])?;

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
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(model = %self.wire.model, max_tokens = request.max_tokens, "AnthropicClient::complete: called");
        let reply: MessagesReply = self.transport.post(&self.wire.body(&request)).await?;
        Ok(reply.into())
    }
}

#[derive(Debug, Deserialize)]
struct MessagesReply {
    content: Vec<Block>,
    #[serde(default)]
    stop_reason: Option<String>,
    usage: Usage,
}

/// Only text blocks are kept; thinking and tool blocks are skipped
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

impl From<MessagesReply> for CompletionResponse {
    fn from(reply: MessagesReply) -> Self {
        let text: String = reply
            .content
            .into_iter()
            .filter_map(|block| match block {
                Block::Text { text } => Some(text),
                Block::Other => None,
            })
            .collect();

        Self {
            content: (!text.is_empty()).then_some(text),
            stop_reason: reply
                .stop_reason
                .as_deref()
                .map(StopReason::from_anthropic)
                .unwrap_or(StopReason::EndTurn),
            usage: TokenUsage {
                input_tokens: reply.usage.input_tokens,
                output_tokens: reply.usage.output_tokens,
            },
        }
    }
}
