pub mod products;
pub mod search;
pub mod system;
pub mod upload;

use actix_web::{web, HttpRequest};

/// Register all HTTP routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(system::root)
        .service(system::stats)
        .service(upload::upload_product)
        .service(search::search_similar)
        .service(search::search_similar_by_user)
        .service(products::list_products)
        .service(products::get_product)
        .service(products::product_image);
}

/// Turn a relative image locator into an absolute URL for this request
pub(crate) fn absolute_url(req: &HttpRequest, locator: &str) -> String {
    let info = req.connection_info();
    format!("{}://{}{}", info.scheme(), info.host(), locator)
}
