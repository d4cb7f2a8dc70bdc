use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use catalens_common::CatalogError;
use serde::Serialize;
use std::fmt;
use tracing::{error, warn};

/// JSON body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// Catalog errors as HTTP responses
#[derive(Debug)]
pub struct ApiError(pub CatalogError);

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        Self(err)
    }
}

impl From<actix_multipart::MultipartError> for ApiError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        Self(CatalogError::invalid_input(format!("Malformed multipart body: {}", err)))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }

        HttpResponse::build(status).json(ErrorBody {
            error: self.0.kind(),
            message: self.0.public_message(),
        })
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
