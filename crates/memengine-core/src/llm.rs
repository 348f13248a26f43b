//! LLM client capability used by summarization (C6).
//!
//! Scoped out of this spec as an external collaborator: an abstract
//! text-generation capability. The engine only needs a single
//! `(system, user, temperature) -> text` operation.

use async_trait::async_trait;

#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("llm call failed: {0}")]
    Failed(String),
}

/// An abstract text-generation capability.
///
/// Summarization is the only consumer of this trait (spec section 4.6);
/// any failure here is fatal to the summarize operation that invoked it and
/// never corrupts already-committed state, since the summary row insert
/// only happens after a successful `generate` call.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, system: &str, user: &str, temperature: f32) -> Result<String, LlmError>;
}
