//! Provider-neutral completion calls
//!
//! The advisor only sees [`LlmClient`]; [`create_client`] picks the concrete
//! provider from configuration.

use std::sync::Arc;

use tracing::debug;

mod anthropic;
pub mod client;
mod error;
mod openai;
mod transport;
mod types;

pub use anthropic::AnthropicClient;
pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage};

use crate::config::LlmConfig;

/// Client for `config.provider`, which must be `anthropic` or `openai`
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "anthropic" => Ok(Arc::new(AnthropicClient::from_config(config)?)),
        "openai" => Ok(Arc::new(OpenAIClient::from_config(config)?)),
        other => Err(LlmError::Config(format!(
            "provider '{other}' is not supported (expected anthropic or openai)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_rejected() {
        let config = LlmConfig {
            provider: "cohere".to_string(),
            ..LlmConfig::default()
        };
        match create_client(&config) {
            Err(LlmError::Config(msg)) => assert!(msg.contains("cohere")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("unknown provider accepted"),
        }
    }

    #[test]
    fn test_missing_key_reported() {
        let config = LlmConfig {
            api_key_env: "CARDADVISOR_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(create_client(&config), Err(LlmError::MissingApiKey(_))));
    }
}
