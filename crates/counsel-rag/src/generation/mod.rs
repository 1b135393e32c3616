//! Grounded answer generation

pub mod prompt;

pub use prompt::{PromptBuilder, NO_DOCUMENTS_CONTEXT};

use std::sync::Arc;

use crate::error::Result;
use crate::providers::LlmProvider;
use crate::retrieval::ScoredChunk;
use crate::types::UserProfile;

/// Generates the final answer from retrieved evidence and the requester's
/// profile. The profile tailors the answer; it never adds evidence.
pub struct AnswerGenerator {
    llm: Arc<dyn LlmProvider>,
}

impl AnswerGenerator {
    /// Create a generator over the answering model
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Generate an answer grounded in `chunks`, tailored to `profile`.
    /// Zero chunks is a valid input: the prompt then states that no relevant
    /// documents were found, forcing the model to acknowledge the gap.
    pub async fn generate(
        &self,
        question: &str,
        chunks: &[ScoredChunk],
        profile: &UserProfile,
    ) -> Result<String> {
        let context = PromptBuilder::build_context(chunks);
        let profile_json = profile.to_prompt_json();
        let user_prompt = PromptBuilder::build_answer_prompt(question, &context, &profile_json);

        tracing::info!(
            "Generating answer with model {} over {} chunk(s)",
            self.llm.model(),
            chunks.len()
        );

        self.llm
            .complete(PromptBuilder::answer_system(), &user_prompt)
            .await
    }
}
