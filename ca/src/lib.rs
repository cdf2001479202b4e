//! cardadvisor - conversational credit card advisor
//!
//! The terminal shell around [`cardrank`]: it collects a user's profile,
//! shortlists cards deterministically, then lets an LLM explain the pick and
//! answer follow-up questions.
//!
//! # Modules
//!
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface
//! - [`intake`] - Interactive preference collection
//! - [`present`] - Console output
//! - [`llm`] - LLM client trait with Anthropic and OpenAI implementations
//! - [`prompts`] - Handlebars prompt templates
//! - [`fetch`] - Web page text from a card's own links
//! - [`advisor`] - The conversation loop

pub mod advisor;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod intake;
pub mod llm;
pub mod present;
pub mod prompts;

// Re-export commonly used types
pub use advisor::{AdvisorOptions, AdvisorSession, Turn};
pub use config::{CatalogConfig, Config, FetchConfig, LlmConfig, PromptsConfig};
pub use fetch::{FetchError, PageFetcher, WebFetcher};
pub use intake::PreferenceCollector;
pub use llm::{
    AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError, OpenAIClient, create_client,
};
pub use prompts::PromptLoader;
