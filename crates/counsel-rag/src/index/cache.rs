//! Process-wide index loading and caching

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::providers::{ArtifactStore, EmbeddingProvider};
use crate::registry::{Partition, PartitionRegistry};
use crate::retrieval::Retriever;
use crate::retry::{with_retry, RetryPolicy};

use super::artifacts::{ChunkRecord, PartitionIndex, VectorTable};

/// Loads partition indexes from durable storage and caches them for the
/// process lifetime.
///
/// Loading is single-flight per partition: concurrent requests for an
/// uncached partition share one in-flight load. A failed load is not cached,
/// so the next request tries again.
pub struct IndexLoader {
    store: Arc<dyn ArtifactStore>,
    registry: Arc<PartitionRegistry>,
    embedder: Arc<dyn EmbeddingProvider>,
    storage: StorageConfig,
    retry: RetryPolicy,
    indexes: DashMap<String, Arc<OnceCell<Arc<PartitionIndex>>>>,
    retrievers: DashMap<(String, usize), Arc<Retriever>>,
}

impl IndexLoader {
    /// Create a loader over the given store and registry
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        registry: Arc<PartitionRegistry>,
        embedder: Arc<dyn EmbeddingProvider>,
        storage: StorageConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            registry,
            embedder,
            storage,
            retry,
            indexes: DashMap::new(),
            retrievers: DashMap::new(),
        }
    }

    /// Load a partition's index, or return the cached one.
    ///
    /// Unknown partitions fail before any storage I/O is attempted.
    pub async fn load(&self, partition_id: &str) -> Result<Arc<PartitionIndex>> {
        let partition = self.registry.resolve(partition_id)?;

        let cell = self
            .indexes
            .entry(partition.id.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let index = cell
            .get_or_try_init(|| self.fetch_index(partition))
            .await?;

        Ok(Arc::clone(index))
    }

    /// Get a retriever bound to `(partition_id, k)`, loading the partition's
    /// index on first use. Retrievers are cached per `(partition, k)`.
    pub async fn get_retriever(&self, partition_id: &str, k: usize) -> Result<Arc<Retriever>> {
        let key = (partition_id.to_string(), k);
        if let Some(retriever) = self.retrievers.get(&key) {
            return Ok(Arc::clone(&retriever));
        }

        let index = self.load(partition_id).await?;
        let retriever = Arc::new(Retriever::new(index, Arc::clone(&self.embedder), k));

        // Concurrent insertion is harmless: both retrievers wrap the same
        // cached index, so keep whichever landed first.
        let entry = self
            .retrievers
            .entry(key)
            .or_insert_with(|| Arc::clone(&retriever));
        Ok(Arc::clone(&entry))
    }

    /// Fetch and decode both artifacts for a partition
    async fn fetch_index(&self, partition: &Partition) -> Result<Arc<PartitionIndex>> {
        let vectors_key = format!(
            "{}/{}",
            partition.storage_prefix, self.storage.vectors_artifact
        );
        let chunks_key = format!(
            "{}/{}",
            partition.storage_prefix, self.storage.chunks_artifact
        );

        tracing::info!(
            "Loading index for partition '{}' from {} store",
            partition.id,
            self.store.name()
        );

        let vector_bytes = self.fetch_artifact(&partition.id, &vectors_key).await?;
        let chunk_bytes = self.fetch_artifact(&partition.id, &chunks_key).await?;

        let table = VectorTable::decode(&vector_bytes)
            .map_err(|e| corrupt(&partition.id, &vectors_key, e))?;
        let records = ChunkRecord::decode_all(&chunk_bytes)
            .map_err(|e| corrupt(&partition.id, &chunks_key, e))?;

        let index = PartitionIndex::from_artifacts(table, records)
            .map_err(|e| corrupt(&partition.id, &partition.storage_prefix, e))?;

        tracing::info!(
            "Partition '{}' loaded: {} chunks, {} dimensions",
            partition.id,
            index.len(),
            index.dimensions()
        );

        Ok(Arc::new(index))
    }

    /// Fetch one artifact with the bounded-retry policy. Missing artifacts
    /// surface as the partition being unavailable and are not retried;
    /// transient storage failures retry up to the policy budget.
    async fn fetch_artifact(&self, partition_id: &str, key: &str) -> Result<Vec<u8>> {
        with_retry(&self.retry, || self.store.fetch(key))
            .await
            .map_err(|e| match e {
                Error::ArtifactMissing(key) => Error::partition_unavailable(
                    partition_id,
                    format!("index artifact '{}' not found", key),
                ),
                other => other,
            })
    }
}

/// A decode or validation failure means the stored artifacts are corrupt
fn corrupt(partition_id: &str, key: &str, cause: Error) -> Error {
    Error::partition_unavailable(
        partition_id,
        format!("corrupt index artifacts at '{}': {}", key, cause),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_partitions;
    use crate::retry::RetryPolicy;
    use crate::testing::{partition_fixture, MemoryStore, StaticEmbedder};
    use std::time::Duration;

    const PREFIX: &str = "vs_professions_data_immigration";

    fn loader_over(store: &Arc<MemoryStore>) -> IndexLoader {
        IndexLoader::new(
            Arc::clone(store) as Arc<dyn ArtifactStore>,
            Arc::new(PartitionRegistry::new(default_partitions()).unwrap()),
            Arc::new(StaticEmbedder::new(vec![1.0, 0.0])),
            StorageConfig::default(),
            RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(2)),
        )
    }

    fn immigration_store() -> Arc<MemoryStore> {
        let (table, records) = partition_fixture(&[
            ("post-study work visas in Canada", vec![1.0, 0.0]),
            ("PR pathways for nurses", vec![0.0, 1.0]),
        ]);
        Arc::new(MemoryStore::new().with_partition(PREFIX, &table, &records))
    }

    #[tokio::test]
    async fn unknown_partition_fails_before_storage_io() {
        let store = Arc::new(MemoryStore::new());
        let loader = loader_over(&store);
        let err = loader.load("nonexistent_partition").await.unwrap_err();
        assert!(matches!(err, Error::UnknownPartition(_)));
        assert_eq!(store.fetches(), 0);
    }

    #[tokio::test]
    async fn caches_loaded_index() {
        let store = immigration_store();
        let loader = loader_over(&store);

        let first = loader.load("professions_immigration").await.unwrap();
        assert_eq!(store.fetches(), 2); // one per artifact
        let second = loader.load("professions_immigration").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.fetches(), 2); // cache hit, no further I/O
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_flight() {
        let store = immigration_store();
        let loader = Arc::new(loader_over(&store));

        let a = {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move { loader.load("professions_immigration").await })
        };
        let b = {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move { loader.load("professions_immigration").await })
        };

        let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.fetches(), 2); // two artifacts, fetched once each
    }

    #[tokio::test]
    async fn missing_artifacts_surface_as_partition_unavailable() {
        let store = Arc::new(MemoryStore::new());
        let loader = loader_over(&store);
        let err = loader.load("professions_immigration").await.unwrap_err();
        assert!(
            matches!(err, Error::PartitionUnavailable { ref id, .. } if id == "professions_immigration")
        );
    }

    #[tokio::test]
    async fn corrupt_artifacts_surface_as_partition_unavailable() {
        let (table, _) = partition_fixture(&[("chunk", vec![1.0, 0.0])]);
        // Vector table describes one row, metadata describes two
        let store = Arc::new(
            MemoryStore::new()
                .with_object(&format!("{}/index.vec", PREFIX), table.encode().unwrap())
                .with_object(
                    &format!("{}/chunks.json", PREFIX),
                    br#"[{"content":"a"},{"content":"b"}]"#.to_vec(),
                ),
        );
        let loader = loader_over(&store);
        let err = loader.load("professions_immigration").await.unwrap_err();
        assert!(matches!(err, Error::PartitionUnavailable { .. }));
    }

    #[tokio::test]
    async fn transient_failures_retry_then_recover() {
        let store = immigration_store();
        store.fail_next_fetches(1);
        let loader = loader_over(&store);

        let index = loader.load("professions_immigration").await.unwrap();
        assert_eq!(index.len(), 2);
        // First fetch failed transiently and was retried: 3 fetches total
        assert_eq!(store.fetches(), 3);
    }

    #[tokio::test]
    async fn failed_loads_are_not_cached() {
        let store = immigration_store();
        // Exhaust the retry budget (2 attempts) for the first artifact
        store.fail_next_fetches(2);
        let loader = loader_over(&store);

        assert!(loader.load("professions_immigration").await.is_err());
        // Next call starts a fresh load and succeeds
        let index = loader.load("professions_immigration").await.unwrap();
        assert_eq!(index.len(), 2);
    }

    #[tokio::test]
    async fn retriever_cache_reuses_loaded_index() {
        let store = immigration_store();
        let loader = loader_over(&store);

        let first = loader.get_retriever("professions_immigration", 3).await.unwrap();
        let second = loader.get_retriever("professions_immigration", 3).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.fetches(), 2);

        // A different k builds a new retriever over the same cached index
        let other_k = loader.get_retriever("professions_immigration", 5).await.unwrap();
        assert_eq!(other_k.k(), 5);
        assert_eq!(store.fetches(), 2);
    }
}
