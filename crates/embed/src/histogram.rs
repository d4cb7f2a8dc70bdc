use async_trait::async_trait;
use catalens_common::{CatalogError, Result};
use image::RgbImage;
use tracing::debug;

use crate::decode::DecodedImage;
use crate::provider::EmbeddingProvider;

/// Deterministic local provider: a joint RGB colour histogram
///
/// Each channel is quantized into `bins` buckets, giving `bins³`
/// dimensions. The histogram is L2-normalized, so identical images map to
/// identical unit vectors.
#[derive(Debug, Clone)]
pub struct ColorHistogramEmbedder {
    bins: usize,
}

impl ColorHistogramEmbedder {
    pub fn new(bins: usize) -> Result<Self> {
        if !(2..=16).contains(&bins) {
            return Err(CatalogError::config(format!(
                "Histogram bins must be between 2 and 16, got {}",
                bins
            )));
        }
        Ok(Self { bins })
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    fn histogram(bins: usize, pixels: &RgbImage) -> Result<Vec<f32>> {
        let mut counts = vec![0f32; bins * bins * bins];
        for pixel in pixels.pixels() {
            let [r, g, b] = pixel.0;
            let q = |v: u8| (v as usize * bins) / 256;
            counts[q(r) * bins * bins + q(g) * bins + q(b)] += 1.0;
        }

        let norm = counts.iter().map(|c| c * c).sum::<f32>().sqrt();
        if norm == 0.0 || !norm.is_finite() {
            return Err(CatalogError::provider("Image produced an empty histogram"));
        }

        for c in counts.iter_mut() {
            *c /= norm;
        }
        Ok(counts)
    }
}

#[async_trait]
impl EmbeddingProvider for ColorHistogramEmbedder {
    fn name(&self) -> &str {
        "color-histogram"
    }

    fn dimension(&self) -> usize {
        self.bins * self.bins * self.bins
    }

    async fn embed(&self, image: &DecodedImage) -> Result<Vec<f32>> {
        let bins = self.bins;
        let pixels = image.pixels.clone();

        debug!(
            "Computing colour histogram - {}x{}, {} bins",
            pixels.width(),
            pixels.height(),
            bins
        );

        tokio::task::spawn_blocking(move || Self::histogram(bins, &pixels))
            .await
            .map_err(|e| CatalogError::provider(format!("Histogram task failed: {}", e)))?
    }
}
