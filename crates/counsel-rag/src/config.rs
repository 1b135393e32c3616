//! Configuration for the RAG engine

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Main RAG engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Backend provider for index artifacts (local or gcp)
    #[serde(default)]
    pub backend: BackendProvider,
    /// LLM configuration (routing + answering invocations)
    #[serde(default)]
    pub llm: LlmConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Artifact storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Retry policy for the router and artifact fetches
    #[serde(default)]
    pub retry: RetryConfig,
    /// Knowledge partitions, fixed at deploy time
    #[serde(default = "default_partitions")]
    pub partitions: Vec<PartitionConfig>,
    /// GCP configuration (required when backend = gcp)
    #[serde(default)]
    pub gcp: Option<GcpConfig>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            backend: BackendProvider::default(),
            llm: LlmConfig::default(),
            embeddings: EmbeddingConfig::default(),
            storage: StorageConfig::default(),
            retrieval: RetrievalConfig::default(),
            retry: RetryConfig::default(),
            partitions: default_partitions(),
            gcp: None,
        }
    }
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
    }
}

/// Backend provider selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    /// Local filesystem artifact store
    #[default]
    Local,
    /// Google Cloud Storage artifact store
    Gcp,
}

/// LLM configuration for an OpenAI-compatible completion service.
///
/// Routing and answering are two independently configured invocations of the
/// same service: routing is a classification task and runs near-deterministic,
/// answering tolerates some paraphrase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Service base URL
    pub base_url: String,
    /// API key; falls back to the OPENAI_API_KEY environment variable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Answering model name
    pub answer_model: String,
    /// Routing model name
    pub routing_model: String,
    /// Temperature for answer generation
    pub answer_temperature: f32,
    /// Temperature for routing (classification, keep at zero)
    pub routing_temperature: f32,
    /// Request timeout for answer generation in seconds
    pub answer_timeout_secs: u64,
    /// Request timeout for routing in seconds
    pub routing_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            answer_model: "gpt-4o".to_string(),
            routing_model: "gpt-4o-mini".to_string(),
            answer_temperature: 0.2,
            routing_temperature: 0.0,
            answer_timeout_secs: 120,
            routing_timeout_secs: 45,
        }
    }
}

/// Embedding configuration.
///
/// The model identity is part of each partition's build-time contract: query
/// vectors must come from the same model the offline indexer used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding model name
    pub model: String,
    /// Embedding dimensions
    pub dimensions: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            timeout_secs: 30,
        }
    }
}

/// Artifact storage configuration.
///
/// Each partition stores two co-located artifacts under its prefix: a dense
/// vector table and the chunk metadata it indexes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for the local backend
    pub root: PathBuf,
    /// Vector table artifact name
    pub vectors_artifact: String,
    /// Chunk metadata artifact name
    pub chunks_artifact: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("indexes"),
            vectors_artifact: "index.vec".to_string(),
            chunks_artifact: "chunks.json".to_string(),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default number of chunks to retrieve
    pub default_top_k: usize,
    /// Lower bound for caller-supplied top_k
    pub min_top_k: usize,
    /// Upper bound for caller-supplied top_k
    pub max_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            min_top_k: 1,
            max_top_k: 10,
        }
    }
}

impl RetrievalConfig {
    /// Clamp a caller-supplied top_k into the configured range
    pub fn clamp_top_k(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_top_k)
            .clamp(self.min_top_k, self.max_top_k)
    }
}

/// Bounded-retry policy, applied uniformly to the router's model call and the
/// index loader's storage fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Base delay between attempts in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound on the backoff delay in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryConfig {
    /// Base delay as a `Duration`
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Maximum delay as a `Duration`
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// One knowledge partition, defined at deploy time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// Stable partition id
    pub id: String,
    /// Routing description; never shown to end users
    pub description: String,
    /// Object-store prefix holding the partition's index artifacts
    pub storage_prefix: String,
}

/// Google Cloud Platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcpConfig {
    /// GCS bucket holding index artifacts
    pub bucket: String,
}

/// The default knowledge partitions of the counseling corpus
pub fn default_partitions() -> Vec<PartitionConfig> {
    vec![
        PartitionConfig {
            id: "course_details_source1".to_string(),
            description: "Contains detailed information about specific university courses from \
                          source 1, including subjects, descriptions, admissions criteria, career \
                          paths, and linked professions."
                .to_string(),
            storage_prefix: "vs_course_details_with_outcomes".to_string(),
        },
        PartitionConfig {
            id: "professions_immigration".to_string(),
            description: "Contains information about immigration pathways, permanent residency \
                          difficulty, post-study work visas, ideal regions, and PR programs for \
                          specific professions in various countries (Australia, NZ, Ireland, UK, \
                          Germany, Canada, USA)."
                .to_string(),
            storage_prefix: "vs_professions_data_immigration".to_string(),
        },
        PartitionConfig {
            id: "professions_jobs".to_string(),
            description: "Contains general information about specific professions, including \
                          descriptions, salary ranges, prospects, required attributes, and \
                          approximate job numbers in various countries."
                .to_string(),
            storage_prefix: "vs_professions_data_with_jobs".to_string(),
        },
        PartitionConfig {
            id: "university_details".to_string(),
            description: "Contains general information about universities, including location, \
                          establishment date, descriptions, overall admission requirements \
                          (exams, fees), rankings, and intake sessions."
                .to_string(),
            storage_prefix: "vs_processed_data_university".to_string(),
        },
        PartitionConfig {
            id: "course_details_source2".to_string(),
            description: "Contains information about specific university courses from source 2, \
                          primarily focused on admissions criteria like fees, deadlines, entry \
                          requirements, and test scores (IELTS, TOEFL, etc.)."
                .to_string(),
            storage_prefix: "vs_course_details_with_outcomes_second_source".to_string(),
        },
    ]
}
