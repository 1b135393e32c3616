//! Google Cloud Storage artifact store

use async_trait::async_trait;

use google_cloud_storage::client::{Client as GcsClient, ClientConfig};
use google_cloud_storage::http::objects::download::Range;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::Error as GcsError;

use crate::config::GcpConfig;
use crate::error::{Error, Result};

use super::artifact_store::ArtifactStore;

/// Artifact store backed by a GCS bucket.
///
/// Keys map directly to object names, so a partition's artifacts live under
/// its storage prefix within the bucket.
pub struct GcsArtifactStore {
    client: GcsClient,
    bucket: String,
}

impl GcsArtifactStore {
    /// Create a store for the configured bucket, authenticating via the
    /// ambient service-account credentials.
    pub async fn new(config: &GcpConfig) -> Result<Self> {
        let client_config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| Error::Config(format!("Failed to create GCS client: {}", e)))?;

        Ok(Self {
            client: GcsClient::new(client_config),
            bucket: config.bucket.clone(),
        })
    }
}

#[async_trait]
impl ArtifactStore for GcsArtifactStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        self.client
            .download_object(
                &GetObjectRequest {
                    bucket: self.bucket.clone(),
                    object: key.to_string(),
                    ..Default::default()
                },
                &Range::default(),
            )
            .await
            .map_err(|e| match &e {
                GcsError::Response(resp) if resp.code == 404 => {
                    Error::ArtifactMissing(key.to_string())
                }
                _ => Error::transient(format!("GCS download failed for '{}': {}", key, e)),
            })
    }

    fn name(&self) -> &str {
        "gcs"
    }
}
