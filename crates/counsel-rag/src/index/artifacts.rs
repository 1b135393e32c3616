//! Serialized index artifacts and the in-memory partition index
//!
//! Each partition is built offline into two co-located artifacts: a dense
//! vector table (`index.vec`, bincode) and the chunk metadata it indexes
//! (`chunks.json`). The embedding model used at build time is the contract
//! for query-time embeddings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::retrieval::ScoredChunk;
use crate::types::DocumentChunk;

/// Dense, row-major vector table for one partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorTable {
    /// Embedding dimensions
    pub dimensions: usize,
    /// Row-major vector data; length is a multiple of `dimensions`
    pub vectors: Vec<f32>,
}

impl VectorTable {
    /// Decode from the bincode artifact
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (table, _) =
            bincode::serde::decode_from_slice::<Self, _>(bytes, bincode::config::standard())
                .map_err(|e| Error::internal(format!("Failed to decode vector table: {}", e)))?;
        Ok(table)
    }

    /// Encode to the bincode artifact format (used by the offline indexer and
    /// test fixtures)
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| Error::internal(format!("Failed to encode vector table: {}", e)))
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.vectors.len() / self.dimensions
        }
    }
}

/// One chunk as stored in the metadata artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Chunk text
    pub content: String,
    /// Source metadata; keys vary by partition
    #[serde(default)]
    pub source: HashMap<String, serde_json::Value>,
}

impl ChunkRecord {
    /// Decode the JSON metadata artifact
    pub fn decode_all(bytes: &[u8]) -> Result<Vec<Self>> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::internal(format!("Failed to decode chunk metadata: {}", e)))
    }

    /// Encode a chunk list to the JSON artifact format
    pub fn encode_all(records: &[Self]) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(records)?)
    }
}

impl From<ChunkRecord> for DocumentChunk {
    fn from(record: ChunkRecord) -> Self {
        Self {
            content: record.content,
            source: record.source,
        }
    }
}

/// One partition's similarity index, materialized in memory.
///
/// Search is an exact cosine scan over the vector table; results come back in
/// strict descending similarity order.
#[derive(Debug)]
pub struct PartitionIndex {
    dimensions: usize,
    vectors: Vec<f32>,
    chunks: Vec<DocumentChunk>,
}

impl PartitionIndex {
    /// Assemble an index from its two decoded artifacts, validating that they
    /// describe each other.
    pub fn from_artifacts(table: VectorTable, records: Vec<ChunkRecord>) -> Result<Self> {
        if table.dimensions == 0 {
            return Err(Error::internal("Vector table has zero dimensions"));
        }
        if table.vectors.len() % table.dimensions != 0 {
            return Err(Error::internal(format!(
                "Vector table length {} is not a multiple of {} dimensions",
                table.vectors.len(),
                table.dimensions
            )));
        }
        let rows = table.rows();
        if rows != records.len() {
            return Err(Error::internal(format!(
                "Vector table has {} rows but metadata describes {} chunks",
                rows,
                records.len()
            )));
        }

        Ok(Self {
            dimensions: table.dimensions,
            vectors: table.vectors,
            chunks: records.into_iter().map(DocumentChunk::from).collect(),
        })
    }

    /// Embedding dimensions of the indexed vectors
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of indexed chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the partition holds no chunks
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Return the `k` chunks most similar to the query vector, descending by
    /// cosine similarity. `k` caps the result; fewer chunks come back when
    /// the partition is smaller.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if query.len() != self.dimensions {
            return Err(Error::embedding(format!(
                "Query embedding has {} dimensions, index expects {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(row, chunk)| {
                let start = row * self.dimensions;
                let vector = &self.vectors[start..start + self.dimensions];
                ScoredChunk {
                    chunk: chunk.clone(),
                    similarity: cosine_similarity(query, vector),
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        Ok(scored)
    }
}

/// Cosine similarity of two equal-length vectors; zero vectors score 0.0
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(content: &str) -> ChunkRecord {
        ChunkRecord {
            content: content.to_string(),
            source: HashMap::new(),
        }
    }

    fn three_chunk_index() -> PartitionIndex {
        let table = VectorTable {
            dimensions: 2,
            vectors: vec![
                1.0, 0.0, // east
                0.0, 1.0, // north
                0.7, 0.7, // northeast
            ],
        };
        let records = vec![record("east"), record("north"), record("northeast")];
        PartitionIndex::from_artifacts(table, records).unwrap()
    }

    #[test]
    fn round_trips_vector_table() {
        let table = VectorTable {
            dimensions: 3,
            vectors: vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
        };
        let decoded = VectorTable::decode(&table.encode().unwrap()).unwrap();
        assert_eq!(decoded.dimensions, 3);
        assert_eq!(decoded.rows(), 2);
        assert_eq!(decoded.vectors, table.vectors);
    }

    #[test]
    fn rejects_mismatched_artifacts() {
        let table = VectorTable {
            dimensions: 2,
            vectors: vec![1.0, 0.0],
        };
        let err = PartitionIndex::from_artifacts(table, vec![record("a"), record("b")]);
        assert!(err.is_err());

        let ragged = VectorTable {
            dimensions: 2,
            vectors: vec![1.0, 0.0, 0.5],
        };
        assert!(PartitionIndex::from_artifacts(ragged, vec![record("a")]).is_err());
    }

    #[test]
    fn search_orders_by_descending_similarity() {
        let index = three_chunk_index();
        let results = index.search(&[1.0, 0.1], 3).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk.content, "east");
        assert!(results[0].similarity >= results[1].similarity);
        assert!(results[1].similarity >= results[2].similarity);
    }

    #[test]
    fn k_caps_but_never_pads() {
        let index = three_chunk_index();
        assert_eq!(index.search(&[1.0, 0.0], 2).unwrap().len(), 2);
        // Asking for more than the partition holds returns what exists
        assert_eq!(index.search(&[1.0, 0.0], 10).unwrap().len(), 3);
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let index = three_chunk_index();
        assert!(index.search(&[1.0, 0.0, 0.0], 2).is_err());
    }
}
