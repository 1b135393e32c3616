//! LLM completion provider trait

use async_trait::async_trait;

use crate::error::Result;

/// Trait for single-turn LLM completion.
///
/// The engine holds two independently configured instances: a
/// near-deterministic one for query routing (classification) and a
/// low-temperature one for answer generation.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a single-turn exchange. `system` seeds the system role when
    /// the backend supports one.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model identifier in use
    fn model(&self) -> &str;
}
