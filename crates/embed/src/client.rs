use async_trait::async_trait;
use catalens_common::{CatalogError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::decode::DecodedImage;
use crate::provider::EmbeddingProvider;
use crate::types::{EmbedResponse, ServiceHealth};

/// Client for an external image-embedding service
///
/// The service receives the raw image bytes with their content type at
/// `POST {base_url}/embed/image` and answers `{"embedding": [...]}`.
/// Failures are reported once; there is no retry.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingClient {
    base_url: String,
    model: String,
    dimension: usize,
    client: Client,
}

impl HttpEmbeddingClient {
    /// Create new embedding service client
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::config(format!("Failed to create HTTP client: {}", e)))?;

        info!("Embedding service client initialized: {}", base_url);
        Ok(Self {
            base_url,
            model: model.into(),
            dimension,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query the service health endpoint
    pub async fn test_connection(&self) -> Result<ServiceHealth> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogError::provider(format!("Failed to connect to embedding service: {}", e)))?
            .error_for_status()
            .map_err(|e| CatalogError::provider(format!("Embedding service health check failed: {}", e)))?;

        response
            .json::<ServiceHealth>()
            .await
            .map_err(|e| CatalogError::provider(format!("Failed to parse health response: {}", e)))
    }

    fn check_embedding(&self, embedding: &[f32]) -> Result<()> {
        if embedding.is_empty() {
            return Err(CatalogError::provider("Empty embedding from service"));
        }
        if embedding.len() != self.dimension {
            return Err(CatalogError::dimension_mismatch(self.dimension, embedding.len()));
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(CatalogError::provider("Embedding contains non-finite values"));
        }
        Ok(())
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingClient {
    fn name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, image: &DecodedImage) -> Result<Vec<f32>> {
        let url = format!("{}/embed/image", self.base_url);

        debug!(
            "Sending embedding request - Model: {}, {} bytes ({})",
            self.model,
            image.bytes.len(),
            image.content_type
        );

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, image.content_type.as_str())
            .body(image.bytes.as_ref().clone())
            .send()
            .await
            .map_err(|e| CatalogError::provider(format!("Failed to send embedding request: {}", e)))?
            .error_for_status()
            .map_err(|e| CatalogError::provider(format!("Embedding service error: {}", e)))?;

        let result: EmbedResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::provider(format!("Failed to parse embedding response: {}", e)))?;

        self.check_embedding(&result.embedding)?;

        debug!("Received embedding - Dimension: {}", result.embedding.len());
        Ok(result.embedding)
    }
}
