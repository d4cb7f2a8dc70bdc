use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use catalens_common::AppConfig;
use catalens_embed::ColorHistogramEmbedder;
use catalens_server::form::MAX_FORM_PARTS;
use catalens_server::routes;
use catalens_server::types::{ProductsResponse, SearchResponse, StatsResponse, UploadResponse};
use catalens_server::{AppState, CatalogService};
use catalens_store::{Database, ImageStore, ProductRepository};
use image::{ImageOutputFormat, Rgb, RgbImage};
use serde_json::Value;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

const BOUNDARY: &str = "catalens-test-boundary";

fn png(color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(16, 16, Rgb(color));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageOutputFormat::Png).unwrap();
    out.into_inner()
}

fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"upload\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(uri: &str, body: Vec<u8>) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(body)
}

fn test_state(dir: &Path) -> (Arc<AppState>, Arc<ProductRepository>) {
    let config = AppConfig {
        upload_dir: dir.join("uploads"),
        database_path: dir.join("products.db"),
        histogram_bins: 2,
        embedding_dim: 8,
        max_upload_bytes: 64 * 1024,
        ..AppConfig::default()
    };

    let db = Arc::new(Database::in_memory().unwrap());
    let repository = Arc::new(ProductRepository::new(db, 8).unwrap());
    let service = CatalogService::new(
        repository.clone(),
        ImageStore::new(config.upload_dir.clone()),
        Arc::new(ColorHistogramEmbedder::new(2).unwrap()),
    )
    .unwrap();

    (Arc::new(AppState::with_service(config, service)), repository)
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .configure(routes::configure),
        )
        .await
    };
}

fn upload_body(name: &str, owner: &str, color: [u8; 3]) -> Vec<u8> {
    multipart_body(
        &[("name", name), ("user_id", owner)],
        Some(("image/png", png(color).as_slice())),
    )
}

fn uploaded_files(dir: &Path) -> usize {
    std::fs::read_dir(dir.join("uploads"))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[actix_web::test]
async fn test_upload_then_list() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = test_state(dir.path());
    let app = app!(state);

    let req = multipart_request("/upload-product", upload_body("Red Mug", "u1", [220, 20, 20]))
        .to_request();
    let uploaded: UploadResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(uploaded.name, "Red Mug");
    assert_eq!(uploaded.user_id, "u1");

    let req = test::TestRequest::get().uri("/products?user_id=u1").to_request();
    let listed: ProductsResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed.total, 1);
    assert_eq!(listed.products[0].id, uploaded.product_id);
    assert!(listed.products[0]
        .image_url
        .ends_with(&format!("/product-image/{}", uploaded.product_id)));

    let req = test::TestRequest::get().uri("/products?user_id=u2").to_request();
    let listed: ProductsResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed.total, 0);

    let req = test::TestRequest::get()
        .uri(&format!("/products/{}", uploaded.product_id))
        .to_request();
    let product: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(product["name"], "Red Mug");
    assert!(product.get("embedding").is_none());
}

#[actix_web::test]
async fn test_search_finds_uploaded_image_first() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = test_state(dir.path());
    let app = app!(state);

    let mut red_id = None;
    for (name, color) in [("Red", [230, 10, 10]), ("Green", [10, 230, 10]), ("Blue", [10, 10, 230])] {
        let req = multipart_request("/upload-product", upload_body(name, "u1", color)).to_request();
        let uploaded: UploadResponse = test::call_and_read_body_json(&app, req).await;
        if name == "Red" {
            red_id = Some(uploaded.product_id);
        }
    }

    let body = multipart_body(&[("limit", "2")], Some(("image/png", png([230, 10, 10]).as_slice())));
    let req = multipart_request("/search-similar", body).to_request();
    let found: SearchResponse = test::call_and_read_body_json(&app, req).await;

    assert_eq!(found.total_found, 3);
    assert_eq!(found.results.len(), 2);
    assert_eq!(Some(found.results[0].product_id), red_id);
    assert!((found.results[0].similarity - 1.0).abs() < 1e-4);
    assert!(found.results[0].similarity >= found.results[1].similarity);
    assert!(found.results[0].image_url.starts_with("http://"));
    assert!(found.user_id.is_none());

    // query images are never stored
    assert_eq!(uploaded_files(dir.path()), 3);
}

#[actix_web::test]
async fn test_search_by_user_without_products() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = test_state(dir.path());
    let app = app!(state);

    let req = multipart_request("/upload-product", upload_body("Lamp", "u1", [90, 90, 20])).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = multipart_body(&[("user_id", "u2")], Some(("image/png", png([90, 90, 20]).as_slice())));
    let req = multipart_request("/search-similar-by-user", body).to_request();
    let found: SearchResponse = test::call_and_read_body_json(&app, req).await;

    assert!(found.results.is_empty());
    assert_eq!(found.total_found, 0);
    assert_eq!(found.user_id.as_deref(), Some("u2"));
    assert!(found.message.contains("u2"));
}

#[actix_web::test]
async fn test_search_by_user_requires_user_id() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = test_state(dir.path());
    let app = app!(state);

    let body = multipart_body(&[], Some(("image/png", png([1, 2, 3]).as_slice())));
    let req = multipart_request("/search-similar-by-user", body).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_non_image_upload_leaves_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let (state, repository) = test_state(dir.path());
    let app = app!(state);

    let body = multipart_body(
        &[("name", "Notes"), ("user_id", "u1")],
        Some(("text/plain", &b"just some text"[..])),
    );
    let req = multipart_request("/upload-product", body).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let error: Value = test::read_body_json(resp).await;
    assert_eq!(error["error"], "invalid_input");

    assert_eq!(repository.count().unwrap(), 0);
    assert_eq!(uploaded_files(dir.path()), 0);
}

#[actix_web::test]
async fn test_oversized_upload_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (state, repository) = test_state(dir.path());
    let app = app!(state);

    let big = vec![0u8; 128 * 1024];
    let body = multipart_body(&[("name", "Huge"), ("user_id", "u1")], Some(("image/png", big.as_slice())));
    let req = multipart_request("/upload-product", body).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(repository.count().unwrap(), 0);
}

#[actix_web::test]
async fn test_form_with_too_many_parts_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (state, repository) = test_state(dir.path());
    let app = app!(state);

    let names: Vec<String> = (0..MAX_FORM_PARTS).map(|i| format!("extra{}", i)).collect();
    let mut fields: Vec<(&str, &str)> = vec![("name", "Mug"), ("user_id", "u1")];
    fields.extend(names.iter().map(|n| (n.as_str(), "x")));

    let body = multipart_body(&fields, Some(("image/png", png([3, 3, 3]).as_slice())));
    let req = multipart_request("/upload-product", body).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(repository.count().unwrap(), 0);
}

#[actix_web::test]
async fn test_zero_limit_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = test_state(dir.path());
    let app = app!(state);

    let body = multipart_body(&[("limit", "0")], Some(("image/png", png([5, 5, 5]).as_slice())));
    let req = multipart_request("/search-similar", body).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_concurrent_uploads_all_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let (state, repository) = test_state(dir.path());
    let app = app!(state);

    let requests = (0..8u8).map(|i| {
        let req = multipart_request(
            "/upload-product",
            upload_body(&format!("Item {}", i), "u1", [i * 30, 100, 200]),
        )
        .to_request();
        test::call_service(&app, req)
    });
    let responses = futures_util::future::join_all(requests).await;

    assert!(responses.iter().all(|r| r.status() == StatusCode::OK));
    assert_eq!(repository.count().unwrap(), 8);
    assert_eq!(uploaded_files(dir.path()), 8);
}

#[actix_web::test]
async fn test_product_image_served_and_missing() {
    let dir = tempfile::tempdir().unwrap();
    let (state, repository) = test_state(dir.path());
    let app = app!(state);

    let original = png([40, 80, 120]);
    let body = multipart_body(
        &[("name", "Bowl"), ("user_id", "u1")],
        Some(("image/png", original.as_slice())),
    );
    let req = multipart_request("/upload-product", body).to_request();
    let uploaded: UploadResponse = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::get()
        .uri(&format!("/product-image/{}", uploaded.product_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let bytes = test::read_body(resp).await;
    assert_eq!(bytes.as_ref(), original.as_slice());

    let record = repository.get_by_id(uploaded.product_id).unwrap();
    std::fs::remove_file(&record.image_path).unwrap();
    let req = test::TestRequest::get()
        .uri(&format!("/product-image/{}", uploaded.product_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/product-image/not-a-uuid").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_stats_and_root() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = test_state(dir.path());
    let app = app!(state);

    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = multipart_request("/upload-product", upload_body("Cup", "u3", [1, 200, 1])).to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/stats").to_request();
    let stats: StatsResponse = test::call_and_read_body_json(&app, req).await;
    assert_eq!(stats.total_products, 1);
    assert_eq!(stats.embedding_dimension, 8);
    assert_eq!(stats.embedding_provider, "color-histogram");
}
