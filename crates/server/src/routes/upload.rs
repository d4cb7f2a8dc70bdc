use actix_multipart::Multipart;
use actix_web::{post, web, HttpResponse};
use catalens_common::CatalogError;
use std::sync::Arc;

use crate::error::ApiResult;
use crate::form::ImageForm;
use crate::service::UploadRequest;
use crate::state::AppState;
use crate::types::UploadResponse;

/// Catalogue a product image
///
/// The workflow runs on its own task, so a client that disconnects midway
/// cannot leave a file without a record.
#[post("/upload-product")]
pub async fn upload_product(
    payload: Multipart,
    state: web::Data<Arc<AppState>>,
) -> ApiResult<HttpResponse> {
    let mut form = ImageForm::read(payload, "image", state.config.max_upload_bytes).await?;

    let name = form.required("name")?;
    let owner = form.required("user_id")?;
    let image = form.take_image()?;

    let catalog = state.catalog.clone();
    let outcome = actix_web::rt::spawn(async move {
        catalog
            .upload(UploadRequest {
                name,
                owner,
                image: image.bytes,
                content_type: image.content_type,
            })
            .await
    })
    .await
    .map_err(|e| CatalogError::internal(format!("Upload task failed: {}", e)))??;

    Ok(HttpResponse::Ok().json(UploadResponse {
        message: "Product uploaded successfully".to_string(),
        product_id: outcome.product_id,
        name: outcome.name,
        user_id: outcome.owner,
    }))
}
