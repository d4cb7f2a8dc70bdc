/// Catalens error types
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Invalid input (non-image content, missing field, bad limit)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown product or missing image behind a valid record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Product id collision
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Embedding computation could not complete
    #[error("Embedding provider failure: {0}")]
    ProviderFailure(String),

    /// Persistence layer unavailable or write rejected
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    /// Zero-norm vector reached the ranker
    #[error("Degenerate vector: {0}")]
    DegenerateVector(String),

    /// Embedding dimensionality differs from the configured one
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CatalogError {
    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create duplicate key error
    pub fn duplicate_key<S: Into<String>>(msg: S) -> Self {
        Self::DuplicateKey(msg.into())
    }

    /// Create provider failure
    pub fn provider<S: Into<String>>(msg: S) -> Self {
        Self::ProviderFailure(msg.into())
    }

    /// Create storage failure
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::StorageFailure(msg.into())
    }

    /// Create degenerate vector error
    pub fn degenerate<S: Into<String>>(msg: S) -> Self {
        Self::DegenerateVector(msg.into())
    }

    /// Create dimension mismatch error
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

// HTTP response conversion
impl CatalogError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::NotFound(_) => 404,
            Self::DuplicateKey(_) => 409,
            Self::ProviderFailure(_) => 502,
            Self::StorageFailure(_) => 503,
            Self::DegenerateVector(_) => 422,
            Self::DimensionMismatch { .. } => 500,
            Self::Config(_) => 500,
            Self::Internal(_) => 500,
            Self::Io(_) => 500,
            Self::Json(_) => 400,
            Self::Other(_) => 500,
        }
    }

    /// Stable machine-readable category
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) | Self::Json(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::DuplicateKey(_) => "duplicate_key",
            Self::ProviderFailure(_) => "provider_failure",
            Self::StorageFailure(_) => "storage_failure",
            Self::DegenerateVector(_) => "degenerate_vector",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::Config(_) => "config",
            Self::Internal(_) | Self::Io(_) | Self::Other(_) => "internal",
        }
    }

    /// Message safe to hand back to callers
    ///
    /// IO, storage and catch-all errors carry OS or library text, so only
    /// their category is reported.
    pub fn public_message(&self) -> String {
        match self {
            Self::Io(_) => "I/O operation failed".to_string(),
            Self::StorageFailure(_) => "Catalog storage is unavailable".to_string(),
            Self::Other(_) | Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(CatalogError::invalid_input("x").status_code(), 400);
        assert_eq!(CatalogError::not_found("x").status_code(), 404);
        assert_eq!(CatalogError::duplicate_key("x").status_code(), 409);
        assert_eq!(CatalogError::dimension_mismatch(3, 4).status_code(), 500);
    }

    #[test]
    fn test_kinds_are_distinguishable() {
        let errors = [
            CatalogError::invalid_input("a"),
            CatalogError::not_found("a"),
            CatalogError::duplicate_key("a"),
            CatalogError::provider("a"),
            CatalogError::storage("a"),
            CatalogError::degenerate("a"),
        ];
        let mut kinds: Vec<_> = errors.iter().map(|e| e.kind()).collect();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn test_public_message_hides_io_detail() {
        let err = CatalogError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "/secret/path denied",
        ));
        assert!(!err.public_message().contains("/secret/path"));
        assert!(!CatalogError::storage("database is locked")
            .public_message()
            .contains("locked"));
        assert_eq!(
            CatalogError::dimension_mismatch(512, 3).public_message(),
            "Embedding dimension mismatch: expected 512, got 3"
        );
    }
}
