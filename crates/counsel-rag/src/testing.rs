//! Test doubles for the engine's injected collaborators
//!
//! Every fake counts its calls so tests can assert which stages ran and how
//! often durable storage was touched.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::index::{ChunkRecord, VectorTable};
use crate::providers::{ArtifactStore, EmbeddingProvider, LlmProvider};

/// LLM double that replays a scripted sequence of outcomes and records the
/// prompts it was given
pub struct ScriptedLlm {
    script: Mutex<Vec<Result<String>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    /// Replay the given outcomes in order; calls past the end fail.
    pub fn new(script: Vec<Result<String>>) -> Self {
        let mut script = script;
        script.reverse();
        Self {
            script: Mutex::new(script),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always return the same completion
    pub fn always(response: &str) -> Self {
        Self::new(vec![Ok(response.to_string())])
    }

    /// Number of completions requested so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent user prompt, if any call was made
    pub fn last_user_prompt(&self) -> Option<String> {
        self.prompts.lock().expect("prompt lock").last().cloned()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, _system: &str, user: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .expect("prompt lock")
            .push(user.to_string());
        let mut script = self.script.lock().expect("script lock");
        match script.pop() {
            Some(outcome) => {
                // `always` semantics: keep replaying the last response
                if script.is_empty() {
                    if let Ok(response) = &outcome {
                        script.push(Ok(response.clone()));
                    }
                }
                outcome
            }
            None => Err(Error::llm("script exhausted")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}

/// Embedder double returning preset vectors by exact query text
pub struct StaticEmbedder {
    dimensions: usize,
    by_text: HashMap<String, Vec<f32>>,
    default: Vec<f32>,
    calls: AtomicUsize,
}

impl StaticEmbedder {
    /// Embedder with a default vector for unmapped texts
    pub fn new(default: Vec<f32>) -> Self {
        Self {
            dimensions: default.len(),
            by_text: HashMap::new(),
            default,
            calls: AtomicUsize::new(0),
        }
    }

    /// Map a specific query text to a vector
    pub fn with_text(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.by_text.insert(text.to_string(), vector);
        self
    }

    /// Number of embeddings requested so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .by_text
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// In-memory artifact store with fetch counting and optional injected
/// transient failures
pub struct MemoryStore {
    objects: HashMap<String, Vec<u8>>,
    fetches: AtomicUsize,
    transient_failures: AtomicU32,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            fetches: AtomicUsize::new(0),
            transient_failures: AtomicU32::new(0),
        }
    }

    /// Add an artifact under `key`
    pub fn with_object(mut self, key: &str, bytes: Vec<u8>) -> Self {
        self.objects.insert(key.to_string(), bytes);
        self
    }

    /// Add a partition's two artifacts under its prefix
    pub fn with_partition(self, prefix: &str, table: &VectorTable, records: &[ChunkRecord]) -> Self {
        self.with_object(
            &format!("{}/index.vec", prefix),
            table.encode().expect("encode vectors"),
        )
        .with_object(
            &format!("{}/chunks.json", prefix),
            ChunkRecord::encode_all(records).expect("encode chunks"),
        )
    }

    /// Fail the next `n` fetches with a transient error
    pub fn fail_next_fetches(&self, n: u32) {
        self.transient_failures.store(n, Ordering::SeqCst);
    }

    /// Number of fetches attempted so far (including failed ones)
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let pending = self.transient_failures.load(Ordering::SeqCst);
        if pending > 0
            && self
                .transient_failures
                .compare_exchange(pending, pending - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            return Err(Error::transient("injected storage failure"));
        }

        self.objects
            .get(key)
            .cloned()
            .ok_or_else(|| Error::ArtifactMissing(key.to_string()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Build a small vector table + chunk records fixture
pub fn partition_fixture(rows: &[(&str, Vec<f32>)]) -> (VectorTable, Vec<ChunkRecord>) {
    let dimensions = rows.first().map(|(_, v)| v.len()).unwrap_or(0);
    let mut vectors = Vec::with_capacity(rows.len() * dimensions);
    let mut records = Vec::with_capacity(rows.len());
    for (content, vector) in rows {
        vectors.extend_from_slice(vector);
        records.push(ChunkRecord {
            content: content.to_string(),
            source: HashMap::new(),
        });
    }
    (
        VectorTable {
            dimensions,
            vectors,
        },
        records,
    )
}
