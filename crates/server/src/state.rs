use catalens_common::{AppConfig, Result};
use catalens_embed::build_provider;
use catalens_store::{Database, ImageStore, ProductRepository};
use std::sync::Arc;
use tracing::info;

use crate::service::CatalogService;

/// Shared application state
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Upload and search workflows
    pub catalog: Arc<CatalogService>,
}

impl AppState {
    /// Open the catalog and build the configured provider
    pub fn new(config: AppConfig) -> Result<Self> {
        let provider = build_provider(&config)?;

        info!("Opening catalog at {}", config.database_path.display());
        let db = Arc::new(Database::new(&config.database_path)?);
        let repository = Arc::new(ProductRepository::new(db, config.embedding_dim)?);
        let images = ImageStore::new(config.upload_dir.clone());

        let catalog = CatalogService::new(repository, images, provider)?;
        Ok(Self::with_service(config, catalog))
    }

    /// State around an already-built service
    pub fn with_service(config: AppConfig, catalog: CatalogService) -> Self {
        Self {
            config,
            catalog: Arc::new(catalog),
        }
    }
}
