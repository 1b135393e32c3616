//! Artifact store trait for durable index storage

use async_trait::async_trait;

use crate::error::Result;

/// Trait for fetching index artifacts from durable storage.
///
/// Keys are partition-relative paths such as
/// `vs_course_details_with_outcomes/index.vec`. A missing object fails with
/// `Error::ArtifactMissing`; connectivity failures with
/// `Error::TransientStorage` so the loader's retry policy can distinguish
/// them.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Fetch an artifact's raw bytes
    async fn fetch(&self, key: &str) -> Result<Vec<u8>>;

    /// Store name for logging
    fn name(&self) -> &str;
}
