use actix_multipart::Multipart;
use actix_web::{post, web, HttpRequest, HttpResponse};
use std::sync::Arc;

use crate::error::ApiResult;
use crate::form::ImageForm;
use crate::routes::absolute_url;
use crate::service::{SearchOutcome, SearchRequest};
use crate::state::AppState;
use crate::types::{SearchResponse, SearchResultItem};

/// Rank the whole catalog, or one owner's products when `user_id` is given
#[post("/search-similar")]
pub async fn search_similar(
    req: HttpRequest,
    payload: Multipart,
    state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let mut form = ImageForm::read(payload, "image", state.config.max_upload_bytes).await?;
    let owner = form.optional("user_id");
    run_search(&req, &state, &mut form, owner).await
}

/// Rank one owner's products; `user_id` is required
#[post("/search-similar-by-user")]
pub async fn search_similar_by_user(
    req: HttpRequest,
    payload: Multipart,
    state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let mut form = ImageForm::read(payload, "image", state.config.max_upload_bytes).await?;
    let owner = form.required("user_id")?;
    run_search(&req, &state, &mut form, Some(owner)).await
}

async fn run_search(
    req: &HttpRequest,
    state: &AppState,
    form: &mut ImageForm,
    owner: Option<String>,
) -> ApiResult<HttpResponse> {
    let limit = state.config.resolve_limit(form.limit()?)?;
    let image = form.take_image()?;

    let outcome = state
        .catalog
        .search(SearchRequest {
            image: image.bytes,
            content_type: image.content_type,
            owner,
            limit,
        })
        .await?;

    Ok(HttpResponse::Ok().json(to_response(req, outcome)))
}

fn to_response(req: &HttpRequest, outcome: SearchOutcome) -> SearchResponse {
    let message = if outcome.owner_has_no_products() {
        format!(
            "No products found for user {}",
            outcome.owner.as_deref().unwrap_or_default()
        )
    } else {
        format!("Found {} similar products", outcome.hits.len())
    };

    let results = outcome
        .hits
        .into_iter()
        .map(|hit| SearchResultItem {
            image_url: absolute_url(req, &hit.image_locator),
            product_id: hit.product_id,
            name: hit.name,
            user_id: hit.owner,
            similarity: hit.similarity,
            created_at: hit.created_at,
        })
        .collect();

    SearchResponse {
        message,
        results,
        total_found: outcome.total_candidates,
        user_id: outcome.owner,
    }
}
