//! Error types for the RAG engine

use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG engine errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Partition id not present in the registry
    #[error("Unknown knowledge partition: {0}")]
    UnknownPartition(String),

    /// Partition index artifacts are missing or corrupt
    #[error("Knowledge partition '{id}' is unavailable: {message}")]
    PartitionUnavailable { id: String, message: String },

    /// A single artifact object does not exist in the store
    #[error("Artifact not found: {0}")]
    ArtifactMissing(String),

    /// Recoverable connectivity failure talking to durable storage
    #[error("Transient storage error: {0}")]
    TransientStorage(String),

    /// Embedding generation failed
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// LLM completion error
    #[error("LLM error: {0}")]
    Llm(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a partition-unavailable error
    pub fn partition_unavailable(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PartitionUnavailable {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create a transient storage error
    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientStorage(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the bounded-retry wrapper should attempt this error again.
    ///
    /// Transport-level failures are worth another attempt; missing or corrupt
    /// artifacts and unknown partitions are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TransientStorage(_) | Self::Llm(_) | Self::Embedding(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(Error::transient("socket reset").is_retryable());
        assert!(Error::llm("HTTP 503").is_retryable());
        assert!(Error::embedding("HTTP 429").is_retryable());
    }

    #[test]
    fn terminal_errors_are_not_retryable() {
        assert!(!Error::UnknownPartition("nope".into()).is_retryable());
        assert!(!Error::partition_unavailable("courses", "corrupt").is_retryable());
        assert!(!Error::ArtifactMissing("vs_courses/index.vec".into()).is_retryable());
        assert!(!Error::Config("bad".into()).is_retryable());
    }
}
