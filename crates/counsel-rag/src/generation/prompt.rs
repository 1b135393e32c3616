//! Prompt templates for grounded answer generation

use crate::retrieval::ScoredChunk;

/// Context placed in the prompt when retrieval returned nothing. The model
/// must acknowledge absent evidence instead of fabricating an answer.
pub const NO_DOCUMENTS_CONTEXT: &str =
    "No relevant documents found in the specified knowledge base.";

/// Prompt builder for the answering model
pub struct PromptBuilder;

impl PromptBuilder {
    /// Format retrieved chunks into numbered blocks with their source info.
    /// An empty set formats as an explicit no-documents statement, never an
    /// empty string.
    pub fn build_context(chunks: &[ScoredChunk]) -> String {
        if chunks.is_empty() {
            return NO_DOCUMENTS_CONTEXT.to_string();
        }

        let blocks: Vec<String> = chunks
            .iter()
            .enumerate()
            .map(|(i, scored)| {
                format!(
                    "--- Document {n} ---\nSource Info: {source}\n\nContent Chunk:\n{content}\n--- End Document {n} ---",
                    n = i + 1,
                    source = scored.chunk.source_label(),
                    content = scored.chunk.display_content(),
                )
            })
            .collect();

        blocks.join("\n\n")
    }

    /// System instructions for the answering model
    pub fn answer_system() -> &'static str {
        "You are an expert AI counselor providing study-abroad guidance. Your goal is to answer \
         the user's query accurately and relevantly based *only* on the provided context \
         documents and the user's profile."
    }

    /// Build the answering prompt from the formatted context, the user's
    /// profile JSON, and the query.
    pub fn build_answer_prompt(question: &str, context: &str, profile_json: &str) -> String {
        format!(
            r#"**CRITICAL INSTRUCTIONS:**
1.  **Prioritize User Profile:** Carefully review the provided 'User Profile'. Tailor your answer to match the user's specific details like 'highestLevel' (e.g., Bachelors, Masters), 'DreamCountry', 'category'/'subCategory' (their field of interest), 'career' goals, and 'Funds'/'selectedPlan' (budget).
2.  **Filter Context:** Answer the query using *only* information from the 'Retrieved Context Documents' that aligns with the User Profile details (especially desired education level, country, and field).
3.  **Acknowledge Mismatches:** If the context documents discuss options that *do not* match the user's profile (e.g., documents mention Bachelor's degrees but the user profile indicates 'Masters' level), explicitly state that the available information might not be for the correct level/field/country based on the user's profile. Do NOT present mismatched information as suitable.
4.  **Cite Sources:** When possible, reference the source information for the document(s) used (e.g., "According to Document [N] (Source: ...)").
5.  **No External Knowledge:** Do not make up information or use knowledge outside the provided context and profile.
6.  **Handle Missing Info:** If the context documents do not contain information to answer the query, even considering the profile, clearly state that the specific information is not available in the retrieved documents.

**User Profile:**
```json
{profile_json}
```

Retrieved Context Documents:
{context}

User Query: {question}

Answer:"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentChunk;
    use serde_json::json;
    use std::collections::HashMap;

    fn scored(content: &str, source: serde_json::Value, similarity: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: DocumentChunk {
                content: content.to_string(),
                source: serde_json::from_value(source).unwrap(),
            },
            similarity,
        }
    }

    #[test]
    fn empty_retrieval_states_no_documents() {
        assert_eq!(PromptBuilder::build_context(&[]), NO_DOCUMENTS_CONTEXT);
    }

    #[test]
    fn context_numbers_documents_and_probes_sources() {
        let chunks = vec![
            scored(
                "MSc Computing at UCD",
                json!({ "course_id": "C-9" }),
                0.9,
            ),
            scored("No metadata here", json!({}), 0.5),
        ];
        let context = PromptBuilder::build_context(&chunks);

        assert!(context.contains("--- Document 1 ---"));
        assert!(context.contains("Source Info: course_id: C-9"));
        assert!(context.contains("--- End Document 2 ---"));
        assert!(context.contains("Source Info: source: unknown"));
    }

    #[test]
    fn context_prefers_blurb_text() {
        let chunks = vec![scored(
            "raw indexed text",
            json!({ "blurb_text": "Polished course summary", "course_id": "C-1" }),
            0.8,
        )];
        let context = PromptBuilder::build_context(&chunks);
        assert!(context.contains("Polished course summary"));
        assert!(!context.contains("raw indexed text"));
    }

    #[test]
    fn answer_prompt_embeds_profile_context_and_question() {
        let mut source = HashMap::new();
        source.insert("serial_no".to_string(), json!(12));
        let context = PromptBuilder::build_context(&[ScoredChunk {
            chunk: DocumentChunk {
                content: "Visa info".to_string(),
                source,
            },
            similarity: 0.7,
        }]);

        let prompt = PromptBuilder::build_answer_prompt(
            "Can I work after graduation?",
            &context,
            "{\n  \"DreamCountry\": \"Canada\"\n}",
        );

        assert!(prompt.contains("CRITICAL INSTRUCTIONS"));
        assert!(prompt.contains("\"DreamCountry\": \"Canada\""));
        assert!(prompt.contains("Visa info"));
        assert!(prompt.contains("User Query: Can I work after graduation?"));
    }
}
