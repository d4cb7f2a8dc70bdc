use actix_web::{get, web, HttpResponse};
use std::sync::Arc;

use crate::error::ApiResult;
use crate::state::AppState;
use crate::types::{RootResponse, StatsResponse};

#[get("/")]
pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(RootResponse {
        message: "Catalens visual product search API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Product count and provider details
#[get("/stats")]
pub async fn stats(state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let stats = state.catalog.stats().await?;
    Ok(HttpResponse::Ok().json(StatsResponse {
        total_products: stats.total_products,
        embedding_provider: stats.provider,
        embedding_dimension: stats.dimension,
    }))
}
