//! Similarity retrieval within one partition

use std::sync::Arc;

use crate::error::Result;
use crate::index::PartitionIndex;
use crate::providers::EmbeddingProvider;
use crate::types::DocumentChunk;

/// One retrieved chunk with its similarity to the query
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The retrieved chunk
    pub chunk: DocumentChunk,
    /// Cosine similarity (higher is more similar)
    pub similarity: f32,
}

/// Retriever bound to one partition's index and a fixed result count.
///
/// Retrievers are cheap handles over the cached index; the loader caches one
/// per `(partition, k)` pair since `k` shapes retrieval behavior.
pub struct Retriever {
    index: Arc<PartitionIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    k: usize,
}

impl Retriever {
    /// Create a retriever over a loaded index
    pub fn new(index: Arc<PartitionIndex>, embedder: Arc<dyn EmbeddingProvider>, k: usize) -> Self {
        Self { index, embedder, k }
    }

    /// Result count this retriever is bound to
    pub fn k(&self) -> usize {
        self.k
    }

    /// Embed the query and return up to `k` chunks, descending by similarity.
    /// No score threshold is applied; `k` is a cap, not a quality filter.
    pub async fn retrieve(&self, query_text: &str) -> Result<Vec<ScoredChunk>> {
        let query_embedding = self.embedder.embed(query_text).await?;
        self.index.search(&query_embedding, self.k)
    }
}
