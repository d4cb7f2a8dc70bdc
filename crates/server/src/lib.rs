//! Catalens HTTP server
//!
//! Actix-web REST API for uploading product images and searching the
//! catalog by visual similarity.

pub mod error;
pub mod form;
pub mod routes;
pub mod service;
pub mod state;
pub mod types;

use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpServer};
use catalens_common::{AppConfig, EmbeddingBackend, Result};
use catalens_embed::HttpEmbeddingClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

pub use error::{ApiError, ApiResult};
pub use service::CatalogService;
pub use state::AppState;

/// CORS policy for the configured origins
pub fn build_cors(config: &AppConfig) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
        .max_age(3600);

    for origin in &config.allowed_origins {
        cors = if origin == "*" {
            cors.allow_any_origin()
        } else {
            cors.allowed_origin(origin)
        };
    }

    cors
}

/// Start the HTTP server and run until shutdown
pub async fn start_server(config: AppConfig) -> Result<()> {
    if config.embedding_backend == EmbeddingBackend::Http {
        check_embedding_service(&config).await;
    }

    let state = Arc::new(AppState::new(config.clone())?);
    let bind_address = config.server_bind_address();
    info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&state.config))
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}

/// Report whether the embedding service answers; start-up continues either way
async fn check_embedding_service(config: &AppConfig) {
    let client = match HttpEmbeddingClient::new(
        config.embedding_service_url.clone(),
        config.embedding_model.clone(),
        config.embedding_dim,
        Duration::from_secs(config.embedding_timeout_secs),
    ) {
        Ok(client) => client,
        Err(e) => {
            warn!("Cannot create embedding client: {}", e);
            return;
        }
    };

    match client.test_connection().await {
        Ok(health) => info!(
            "Embedding service {} is {} (model: {:?})",
            client.base_url(),
            health.status,
            health.model
        ),
        Err(e) => warn!("Embedding service {} unreachable: {}", client.base_url(), e),
    }
}
