//! Local filesystem artifact store

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::{Error, Result};

use super::artifact_store::ArtifactStore;

/// Artifact store backed by a local directory tree.
///
/// Artifacts live at `<root>/<partition_prefix>/<artifact_name>`, mirroring
/// the object-store layout so the same keys work against either backend.
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.root.join(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::ArtifactMissing(key.to_string()))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetches_existing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("vs_test");
        std::fs::create_dir_all(&prefix).unwrap();
        std::fs::write(prefix.join("chunks.json"), b"[]").unwrap();

        let store = LocalArtifactStore::new(dir.path());
        let bytes = store.fetch("vs_test/chunks.json").await.unwrap();
        assert_eq!(bytes, b"[]");
    }

    #[tokio::test]
    async fn missing_artifact_is_distinguished() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        let err = store.fetch("vs_test/index.vec").await.unwrap_err();
        assert!(matches!(err, Error::ArtifactMissing(key) if key == "vs_test/index.vec"));
    }
}
