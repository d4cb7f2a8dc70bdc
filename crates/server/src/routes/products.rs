use actix_files::NamedFile;
use actix_web::{get, web, HttpRequest, HttpResponse};
use catalens_common::CatalogError;
use catalens_store::ProductSummary;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::routes::absolute_url;
use crate::service::image_locator;
use crate::state::AppState;
use crate::types::{ProductItem, ProductsQuery, ProductsResponse};

fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|_| CatalogError::not_found(format!("Product {} not found", raw)).into())
}

fn to_item(req: &HttpRequest, summary: ProductSummary) -> ProductItem {
    ProductItem {
        image_url: absolute_url(req, &image_locator(summary.id)),
        id: summary.id,
        name: summary.name,
        user_id: summary.owner,
        created_at: summary.created_at,
    }
}

/// List products, newest last, optionally for one owner
#[get("/products")]
pub async fn list_products(
    req: HttpRequest,
    query: web::Query<ProductsQuery>,
    state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let owner = query
        .into_inner()
        .user_id
        .filter(|owner| !owner.trim().is_empty());

    let products: Vec<ProductItem> = state
        .catalog
        .list(owner)
        .await?
        .into_iter()
        .map(|summary| to_item(&req, summary))
        .collect();

    let total = products.len();
    Ok(HttpResponse::Ok().json(ProductsResponse {
        message: format!("Found {} products", total),
        products,
        total,
    }))
}

#[get("/products/{id}")]
pub async fn get_product(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let id = parse_id(&path.into_inner())?;
    let summary = state.catalog.get(id).await?;
    Ok(HttpResponse::Ok().json(to_item(&req, summary)))
}

/// Serve a product's stored image with a type inferred from its extension
#[get("/product-image/{id}")]
pub async fn product_image(
    path: web::Path<String>,
    state: web::Data<Arc<AppState>>,
) -> ApiResult<NamedFile> {
    let id = parse_id(&path.into_inner())?;
    let file_path = state.catalog.image_path(id).await?;
    let file = NamedFile::open_async(&file_path)
        .await
        .map_err(CatalogError::from)?;
    Ok(file)
}
