//! Completion-provider abstraction for the remote model API.
//!
//! The orchestrator only sees this trait; the concrete OpenAI client lives
//! behind it, and tests substitute a scripted implementation.

mod openai;

pub use openai::OpenAiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Unified interface for completion providers.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Send a completion request and return the generated text.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError>;
}

/// Error from a provider.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub provider: String,
    pub model: String,
    pub message: String,
    pub status_code: Option<u16>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}] {}", self.provider, self.model, self.message)
    }
}

impl std::error::Error for ProviderError {}

/// A completion request.
///
/// The Responses API takes one flattened input string, so the prompt is
/// assembled upstream (persona text plus role-labelled turns).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model to use
    pub model: String,
    /// Full prompt text
    pub input: String,
}

/// A completed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// Provider name
    pub provider: String,
    /// Model used
    pub model: String,
    /// Generated text
    pub text: String,
    /// Response latency in milliseconds
    pub latency_ms: u64,
}
