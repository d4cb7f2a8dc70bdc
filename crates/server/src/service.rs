use catalens_common::{CatalogError, Result};
use catalens_embed::{decode_image, DecodedImage, EmbeddingProvider};
use catalens_store::{ImageStore, NewProduct, ProductRepository, ProductSummary};
use catalens_vector::{l2_norm, rank};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// An image submitted for cataloguing
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub name: String,
    pub owner: String,
    pub image: Vec<u8>,
    pub content_type: String,
}

/// A catalogued product
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub product_id: Uuid,
    pub name: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

/// A query image, optionally restricted to one owner
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub image: Vec<u8>,
    pub content_type: String,
    pub owner: Option<String>,
    pub limit: usize,
}

/// One ranked search hit
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub product_id: Uuid,
    pub name: String,
    pub owner: String,
    pub image_locator: String,
    pub similarity: f32,
    pub created_at: DateTime<Utc>,
}

/// Result of a search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub hits: Vec<SearchHit>,

    /// Number of products that were scored
    pub total_candidates: usize,

    /// Owner filter that was applied, if any
    pub owner: Option<String>,
}

impl SearchOutcome {
    /// True when an owner filter matched no products at all
    pub fn owner_has_no_products(&self) -> bool {
        self.owner.is_some() && self.total_candidates == 0
    }
}

/// Catalog statistics
#[derive(Debug, Clone)]
pub struct CatalogStats {
    pub total_products: u64,
    pub provider: String,
    pub dimension: usize,
}

/// Relative locator for a product's image
pub fn image_locator(id: Uuid) -> String {
    format!("/product-image/{}", id)
}

/// Upload and search workflows over the catalog
///
/// Holds the only provider instance; every request shares it.
pub struct CatalogService {
    repository: Arc<ProductRepository>,
    images: ImageStore,
    provider: Arc<dyn EmbeddingProvider>,
}

impl CatalogService {
    /// Create new catalog service
    ///
    /// Fails when the provider's dimension differs from the store's.
    pub fn new(
        repository: Arc<ProductRepository>,
        images: ImageStore,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        if provider.dimension() != repository.dimension() {
            return Err(CatalogError::config(format!(
                "Provider {} produces {} dimensions but the catalog stores {}",
                provider.name(),
                provider.dimension(),
                repository.dimension()
            )));
        }

        info!(
            "Catalog service ready (provider: {}, dimension: {})",
            provider.name(),
            provider.dimension()
        );

        Ok(Self {
            repository,
            images,
            provider,
        })
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// Store an image, embed it and record the product
    ///
    /// Either the file and the record both exist afterwards, or neither
    /// does. The file is removed again if embedding or insertion fails.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome> {
        let name = require_text("name", &request.name)?;
        let owner = require_text("user_id", &request.owner)?;

        let decoded = decode(request.image, request.content_type).await?;

        let id = Uuid::new_v4();
        let image_path = self
            .images
            .save(id, &decoded.extension(), &decoded.bytes)
            .await?;
        debug!("Saved upload {} to {}", id, image_path.display());

        let embedding = match self.provider.embed(&decoded).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Embedding failed for upload {}: {}", id, e);
                self.discard_image(&image_path).await;
                return Err(e);
            }
        };

        let product = NewProduct {
            id,
            name,
            owner,
            image_path: image_path.clone(),
            embedding,
            created_at: None,
        };

        match self.blocking(move |repo| repo.insert(product)).await {
            Ok(record) => {
                info!(
                    "Catalogued product {} ({}) for owner {}",
                    record.id, record.name, record.owner
                );
                Ok(UploadOutcome {
                    product_id: record.id,
                    name: record.name,
                    owner: record.owner,
                    created_at: record.created_at,
                })
            }
            Err(e) => {
                warn!("Insert failed for upload {}: {}", id, e);
                self.discard_image(&image_path).await;
                Err(e)
            }
        }
    }

    /// Rank catalogued products by similarity to a query image
    ///
    /// The query image is never stored.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchOutcome> {
        let owner = match request.owner {
            Some(owner) => Some(require_text("user_id", &owner)?),
            None => None,
        };
        if request.limit == 0 {
            return Err(CatalogError::invalid_input("limit must be a positive integer"));
        }

        let decoded = decode(request.image, request.content_type).await?;
        let query = self.provider.embed(&decoded).await?;
        self.check_query(&query)?;

        let filter = owner.clone();
        let records = self
            .blocking(move |repo| match filter {
                Some(owner) => repo.list_by_owner(&owner),
                None => repo.list_all(),
            })
            .await?;

        if records.is_empty() {
            debug!("Search over an empty candidate set (owner: {:?})", owner);
            return Ok(SearchOutcome {
                hits: Vec::new(),
                total_candidates: 0,
                owner,
            });
        }

        let candidates: Vec<_> = records
            .into_iter()
            .map(|record| (record.summary(), record.embedding))
            .collect();

        let ranking = rank(&query, candidates, request.limit)?;
        let total_candidates = ranking.total_candidates;

        let hits = ranking
            .hits
            .into_iter()
            .map(|hit| SearchHit {
                image_locator: image_locator(hit.item.id),
                product_id: hit.item.id,
                name: hit.item.name,
                owner: hit.item.owner,
                similarity: hit.score,
                created_at: hit.item.created_at,
            })
            .collect::<Vec<_>>();

        info!(
            "Search returned {} of {} candidates (owner: {:?})",
            hits.len(),
            total_candidates,
            owner
        );

        Ok(SearchOutcome {
            hits,
            total_candidates,
            owner,
        })
    }

    /// Product metadata, optionally for one owner
    pub async fn list(&self, owner: Option<String>) -> Result<Vec<ProductSummary>> {
        self.blocking(move |repo| repo.list_summaries(owner.as_deref()))
            .await
    }

    /// One product's metadata
    pub async fn get(&self, id: Uuid) -> Result<ProductSummary> {
        let record = self.blocking(move |repo| repo.get_by_id(id)).await?;
        Ok(record.summary())
    }

    /// Location of a product's image file
    ///
    /// `NotFound` when the product is unknown or its file is gone.
    pub async fn image_path(&self, id: Uuid) -> Result<PathBuf> {
        let record = self.blocking(move |repo| repo.get_by_id(id)).await?;
        if !self.images.exists(&record.image_path).await {
            warn!("Image file for product {} is missing", id);
            return Err(CatalogError::not_found(format!(
                "Image for product {} is missing",
                id
            )));
        }
        Ok(record.image_path)
    }

    /// Raw bytes of a product's image
    pub async fn image_bytes(&self, id: Uuid) -> Result<Vec<u8>> {
        let path = self.image_path(id).await?;
        self.images.read(&path).await
    }

    pub async fn stats(&self) -> Result<CatalogStats> {
        let total_products = self.blocking(|repo| repo.count()).await?;
        Ok(CatalogStats {
            total_products,
            provider: self.provider.name().to_string(),
            dimension: self.provider.dimension(),
        })
    }

    /// Reject a query vector no stored embedding could be compared with,
    /// even when there is nothing to compare it against
    fn check_query(&self, query: &[f32]) -> Result<()> {
        if query.len() != self.dimension() {
            return Err(CatalogError::dimension_mismatch(self.dimension(), query.len()));
        }
        let norm = l2_norm(query);
        if norm == 0.0 || !norm.is_finite() {
            return Err(CatalogError::degenerate(format!(
                "query embedding from {} has norm {}",
                self.provider.name(),
                norm
            )));
        }
        Ok(())
    }

    async fn discard_image(&self, path: &Path) {
        if let Err(e) = self.images.remove(path).await {
            error!("Failed to remove orphaned image {}: {}", path.display(), e);
        }
    }

    /// Run a repository call off the async workers
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ProductRepository) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let repository = self.repository.clone();
        tokio::task::spawn_blocking(move || f(&repository))
            .await
            .map_err(|e| CatalogError::internal(format!("Store task failed: {}", e)))?
    }
}

fn require_text(field: &str, value: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(CatalogError::invalid_input(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

async fn decode(bytes: Vec<u8>, content_type: String) -> Result<DecodedImage> {
    tokio::task::spawn_blocking(move || decode_image(bytes, &content_type))
        .await
        .map_err(|e| CatalogError::internal(format!("Decode task failed: {}", e)))?
}
