use async_trait::async_trait;
use thiserror::Error;

pub type GeneratorResult<T> = Result<T, GeneratorError>;

/// A single completion request sent to the hosted model.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model identifier, taken from [crate::GenerationConfig].
    pub model: String,
    /// The system prompt establishing the stage's role and output contract.
    pub system: String,
    /// The stage-specific user prompt.
    pub user: String,
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The provider could not be reached, or returned an error response
    #[error("provider request failed: {0}")]
    Provider(String),
    /// The provider responded, but without any usable text
    #[error("provider returned no text")]
    Empty,
}

/// Represents a type that can produce completions from a hosted language model
#[async_trait]
pub trait Generator: Send + Sync + 'static {
    async fn complete(&self, request: CompletionRequest) -> GeneratorResult<String>;
}
