//! The RAG orchestrator: routing, retrieval, and generation as one
//! synchronous request/response pipeline

use std::sync::Arc;
use std::time::Instant;

use crate::config::{BackendProvider, RagConfig, RetrievalConfig};
use crate::error::{Error, Result};
use crate::generation::AnswerGenerator;
use crate::index::IndexLoader;
use crate::providers::openai::{OpenAiChat, OpenAiClient, OpenAiEmbedder};
use crate::providers::{ArtifactStore, EmbeddingProvider, LlmProvider};
use crate::registry::PartitionRegistry;
use crate::retrieval::ScoredChunk;
use crate::retry::RetryPolicy;
use crate::routing::QueryRouter;
use crate::types::UserProfile;

/// Answer returned when routing cannot determine a partition
const ROUTING_FAILED_ANSWER: &str =
    "Sorry, I could not determine the relevant knowledge base for your query.";

/// Answer returned when generation fails after retrieval succeeded
const GENERATION_FAILED_ANSWER: &str =
    "Sorry, I could not produce an answer to your question. Please try again.";

/// The query-answering pipeline consumed by the dashboard and CLI.
///
/// Collaborators are injected at construction; the only shared mutable state
/// is the loader's caches, so one pipeline instance serves many concurrent
/// requests. Each request runs the stages strictly in order, each at most
/// once, and always resolves to a human-readable answer string.
pub struct RagPipeline {
    router: QueryRouter,
    loader: IndexLoader,
    generator: AnswerGenerator,
    retrieval: RetrievalConfig,
}

impl RagPipeline {
    /// Assemble a pipeline from injected collaborators
    pub fn new(
        config: &RagConfig,
        registry: Arc<PartitionRegistry>,
        store: Arc<dyn ArtifactStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        routing_llm: Arc<dyn LlmProvider>,
        answer_llm: Arc<dyn LlmProvider>,
    ) -> Self {
        let retry = RetryPolicy::from(&config.retry);
        Self {
            router: QueryRouter::new(routing_llm, Arc::clone(&registry), retry),
            loader: IndexLoader::new(store, registry, embedder, config.storage.clone(), retry),
            generator: AnswerGenerator::new(answer_llm),
            retrieval: config.retrieval.clone(),
        }
    }

    /// Build the production pipeline from configuration: OpenAI-backed
    /// routing, answering, and embeddings over the configured artifact store.
    pub async fn from_config(config: RagConfig) -> Result<Self> {
        let registry = Arc::new(PartitionRegistry::new(config.partitions.clone())?);

        let client = Arc::new(OpenAiClient::new(&config.llm)?);
        let routing_llm: Arc<dyn LlmProvider> =
            Arc::new(OpenAiChat::for_routing(Arc::clone(&client), &config.llm));
        let answer_llm: Arc<dyn LlmProvider> =
            Arc::new(OpenAiChat::for_answering(Arc::clone(&client), &config.llm));
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(OpenAiEmbedder::new(client, &config.embeddings));

        let store: Arc<dyn ArtifactStore> = match config.backend {
            BackendProvider::Local => Arc::new(
                crate::providers::local::LocalArtifactStore::new(config.storage.root.clone()),
            ),
            BackendProvider::Gcp => {
                #[cfg(feature = "gcp")]
                {
                    let gcp = config.gcp.as_ref().ok_or_else(|| {
                        Error::Config(
                            "GCP backend selected but gcp config is missing".to_string(),
                        )
                    })?;
                    Arc::new(crate::providers::gcs::GcsArtifactStore::new(gcp).await?)
                }
                #[cfg(not(feature = "gcp"))]
                {
                    return Err(Error::Config(
                        "GCP backend selected but the gcp feature is not enabled. \
                         Rebuild with --features gcp"
                            .to_string(),
                    ));
                }
            }
        };

        tracing::info!(
            "Pipeline initialized: {} partitions, routing model {}, answering model {}",
            registry.len(),
            config.llm.routing_model,
            config.llm.answer_model
        );

        Ok(Self::new(
            &config,
            registry,
            store,
            embedder,
            routing_llm,
            answer_llm,
        ))
    }

    /// Answer a free-text question, optionally tailored by a requester
    /// profile. `top_k` is clamped into the configured range; `None` takes
    /// the default.
    ///
    /// Always returns a non-empty string: failures come back as explanatory
    /// text, never as an error or panic.
    pub async fn answer_query(
        &self,
        query_text: &str,
        profile: Option<UserProfile>,
        top_k: Option<usize>,
    ) -> String {
        let k = self.retrieval.clamp_top_k(top_k);
        let profile = profile.unwrap_or_default();

        // Routing
        let routing_start = Instant::now();
        let Some(partition_id) = self.router.route(query_text).await else {
            return ROUTING_FAILED_ANSWER.to_string();
        };
        tracing::info!(
            "Routing took {:?}, chose '{}'",
            routing_start.elapsed(),
            partition_id
        );

        // Retrieval
        let retrieval_start = Instant::now();
        let chunks = match self.retrieve(&partition_id, query_text, k).await {
            Ok(chunks) => chunks,
            Err(Error::PartitionUnavailable { id, message }) => {
                tracing::error!("Partition '{}' unavailable: {}", id, message);
                return format!(
                    "The '{}' knowledge base is currently unavailable. Please try again later.",
                    id
                );
            }
            Err(e) => {
                tracing::error!(
                    "Error retrieving documents from '{}': {}",
                    partition_id,
                    e
                );
                return format!(
                    "Could not retrieve information from the '{}' knowledge base.",
                    partition_id
                );
            }
        };
        tracing::info!(
            "Retrieved {} document(s) from '{}' in {:?}",
            chunks.len(),
            partition_id,
            retrieval_start.elapsed()
        );

        // Generation, with whatever was retrieved (possibly nothing)
        let generation_start = Instant::now();
        match self.generator.generate(query_text, &chunks, &profile).await {
            Ok(answer) if !answer.trim().is_empty() => {
                tracing::info!("Answer generated in {:?}", generation_start.elapsed());
                answer
            }
            Ok(_) => {
                tracing::warn!("Answering model returned an empty response");
                GENERATION_FAILED_ANSWER.to_string()
            }
            Err(e) => {
                tracing::error!("Answer generation failed: {}", e);
                GENERATION_FAILED_ANSWER.to_string()
            }
        }
    }

    /// Retrieve the top-`k` chunks for the query from one partition
    async fn retrieve(
        &self,
        partition_id: &str,
        query_text: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let retriever = self.loader.get_retriever(partition_id, k).await?;
        retriever.retrieve(query_text).await
    }
}
