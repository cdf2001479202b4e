//! The provider seam

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// A stateless completion endpoint
///
/// Clients keep no conversation; the advisor renders history into each prompt.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
