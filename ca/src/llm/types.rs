//! Provider-neutral request and reply shapes
//!
//! Text only. Every advisor prompt is one rendered system prompt plus the
//! user turn(s) that follow it.

use serde::{Deserialize, Serialize};

/// One call's worth of input
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub messages: Vec<Message>,
    /// Requested reply budget; clients clamp it to their configured ceiling
    pub max_tokens: u32,
    /// `None` keeps the configured temperature
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// System prompt followed by a single user turn
    pub fn single(system_prompt: impl Into<String>, user: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages: vec![Message::new(Role::User, user)],
            max_tokens,
            temperature: None,
        }
    }

    pub fn with_temperature(self, temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// What came back from one call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub content: Option<String>,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// A finished text reply with no usage figures
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    /// Trimmed reply text; blank replies count as no reply
    pub fn text_content(&self) -> Option<&str> {
        self.content.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
}

impl StopReason {
    /// Anthropic `stop_reason`; anything unrecognised is a normal end
    pub fn from_anthropic(reason: &str) -> Self {
        match reason {
            "max_tokens" => Self::MaxTokens,
            "stop_sequence" => Self::StopSequence,
            _ => Self::EndTurn,
        }
    }

    /// OpenAI `finish_reason`
    pub fn from_openai(reason: Option<&str>) -> Self {
        match reason {
            Some("length") => Self::MaxTokens,
            _ => Self::EndTurn,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}
