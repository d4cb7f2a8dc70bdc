use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upload result
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub product_id: Uuid,
    pub name: String,
    pub user_id: String,
}

/// One ranked product
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub product_id: Uuid,
    pub name: String,
    pub user_id: String,

    /// Absolute URL of the product image
    pub image_url: String,

    /// Cosine similarity in [-1, 1]
    pub similarity: f32,
    pub created_at: DateTime<Utc>,
}

/// Search result
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub message: String,
    pub results: Vec<SearchResultItem>,

    /// Number of products that were compared
    pub total_found: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Product metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct ProductItem {
    pub id: Uuid,
    pub name: String,
    pub user_id: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// Product listing
#[derive(Debug, Serialize, Deserialize)]
pub struct ProductsResponse {
    pub message: String,
    pub products: Vec<ProductItem>,
    pub total: usize,
}

/// Query string of `GET /products`
#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    pub user_id: Option<String>,
}

/// Catalog statistics
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_products: u64,
    pub embedding_provider: String,
    pub embedding_dimension: usize,
}

/// Service banner
#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
}
