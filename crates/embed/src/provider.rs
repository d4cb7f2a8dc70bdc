use async_trait::async_trait;
use catalens_common::{AppConfig, CatalogError, EmbeddingBackend, Result};
use std::sync::Arc;
use tracing::info;

use crate::client::HttpEmbeddingClient;
use crate::decode::DecodedImage;
use crate::histogram::ColorHistogramEmbedder;

/// Maps a decoded image to a unit-length vector of fixed dimensionality
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name, for logs and stats
    fn name(&self) -> &str;

    /// Output dimensionality, constant for the provider's lifetime
    fn dimension(&self) -> usize;

    /// Compute the embedding for one image
    async fn embed(&self, image: &DecodedImage) -> Result<Vec<f32>>;
}

/// Construct the configured provider
///
/// Called once at start-up; the result is shared by every request.
pub fn build_provider(config: &AppConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match config.embedding_backend {
        EmbeddingBackend::Histogram => {
            Arc::new(ColorHistogramEmbedder::new(config.histogram_bins)?)
        }
        EmbeddingBackend::Http => Arc::new(HttpEmbeddingClient::new(
            config.embedding_service_url.clone(),
            config.embedding_model.clone(),
            config.embedding_dim,
            std::time::Duration::from_secs(config.embedding_timeout_secs),
        )?),
    };

    if provider.dimension() != config.embedding_dim {
        return Err(CatalogError::config(format!(
            "Provider '{}' produces {} dimensions but the catalog is configured for {}",
            provider.name(),
            provider.dimension(),
            config.embedding_dim
        )));
    }

    info!(
        "Embedding provider ready: {} ({} dims)",
        provider.name(),
        provider.dimension()
    );
    Ok(provider)
}
