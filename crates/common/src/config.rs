use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which embedding provider backs the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local joint RGB histogram (deterministic, no model)
    Histogram,
    /// External embedding service over HTTP
    Http,
}

impl EmbeddingBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Histogram => "histogram",
            Self::Http => "http",
        }
    }
}

impl FromStr for EmbeddingBackend {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "histogram" => Ok(Self::Histogram),
            "http" => Ok(Self::Http),
            other => Err(CatalogError::config(format!(
                "Unknown embedding backend '{}' (expected histogram or http)",
                other
            ))),
        }
    }
}

/// Catalens application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Data base path
    pub db_base_path: PathBuf,

    /// Directory holding product images
    pub upload_dir: PathBuf,

    /// SQLite catalog file
    pub database_path: PathBuf,

    /// Embedding provider backend
    pub embedding_backend: EmbeddingBackend,

    /// External embedding service base URL
    pub embedding_service_url: String,

    /// Embedding model name reported by the service
    pub embedding_model: String,

    /// Embedding dimensionality, fixed for the lifetime of the store
    pub embedding_dim: usize,

    /// Bins per channel for the histogram backend
    pub histogram_bins: usize,

    /// Request timeout for the embedding service
    pub embedding_timeout_secs: u64,

    /// Server bind address
    pub server_host: String,

    /// Server port
    pub server_port: u16,

    /// CORS origins
    pub allowed_origins: Vec<String>,

    /// Largest accepted image payload
    pub max_upload_bytes: usize,

    /// Search limit when the caller gives none
    pub default_search_limit: usize,

    /// Upper bound applied to caller-supplied limits
    pub max_search_limit: usize,

    /// Log directory
    pub log_dir: PathBuf,

    /// Log level
    pub log_level: String,
}

const DEFAULT_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_base_path: PathBuf::from("./db"),
            upload_dir: PathBuf::from("./db/uploads"),
            database_path: PathBuf::from("./db/products.db"),
            embedding_backend: EmbeddingBackend::Histogram,
            embedding_service_url: "http://localhost:9000".to_string(),
            embedding_model: "ViT-B/32".to_string(),
            embedding_dim: 512,
            histogram_bins: 8,
            embedding_timeout_secs: 60,
            server_host: "0.0.0.0".to_string(),
            server_port: 8000,
            allowed_origins: DEFAULT_ORIGINS.iter().map(|s| s.to_string()).collect(),
            max_upload_bytes: 10 * 1024 * 1024,
            default_search_limit: 10,
            max_search_limit: 100,
            log_dir: PathBuf::from("./db/log"),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, CatalogError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let defaults = Self::default();
        let db_base_path =
            Self::get_env_path("DB_BASE_PATH").unwrap_or_else(|| defaults.db_base_path.clone());

        let embedding_backend = match std::env::var("EMBEDDING_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.embedding_backend,
        };
        let histogram_bins = Self::get_env_parsed("HISTOGRAM_BINS").unwrap_or(defaults.histogram_bins);
        let embedding_dim = Self::get_env_parsed("EMBEDDING_DIM").unwrap_or(match embedding_backend {
            EmbeddingBackend::Histogram => histogram_bins.pow(3),
            EmbeddingBackend::Http => defaults.embedding_dim,
        });

        let config = Self {
            upload_dir: Self::get_env_path("UPLOAD_DIR")
                .unwrap_or_else(|| db_base_path.join("uploads")),
            database_path: Self::get_env_path("DATABASE_PATH")
                .unwrap_or_else(|| db_base_path.join("products.db")),
            log_dir: Self::get_env_path("LOG_DIR").unwrap_or_else(|| db_base_path.join("log")),
            db_base_path,
            embedding_backend,
            embedding_service_url: std::env::var("EMBEDDING_SERVICE_URL")
                .unwrap_or(defaults.embedding_service_url),
            embedding_model: std::env::var("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            embedding_dim,
            histogram_bins,
            embedding_timeout_secs: Self::get_env_parsed("EMBEDDING_TIMEOUT_SECS")
                .unwrap_or(defaults.embedding_timeout_secs),
            server_host: std::env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: Self::get_env_parsed("SERVER_PORT").unwrap_or(defaults.server_port),
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .map(|s| Self::split_origins(&s))
                .unwrap_or(defaults.allowed_origins),
            max_upload_bytes: Self::get_env_parsed("MAX_UPLOAD_BYTES")
                .unwrap_or(defaults.max_upload_bytes),
            default_search_limit: Self::get_env_parsed("DEFAULT_SEARCH_LIMIT")
                .unwrap_or(defaults.default_search_limit),
            max_search_limit: Self::get_env_parsed("MAX_SEARCH_LIMIT")
                .unwrap_or(defaults.max_search_limit),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        };

        config.validate()?;

        // Ensure required directories exist
        config.ensure_directories()?;

        Ok(config)
    }

    /// Get PathBuf from environment variable
    fn get_env_path(key: &str) -> Option<PathBuf> {
        std::env::var(key).ok().map(PathBuf::from)
    }

    fn get_env_parsed<T: FromStr>(key: &str) -> Option<T> {
        std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
    }

    fn split_origins(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Ensure required directories exist, create if not
    pub fn ensure_directories(&self) -> Result<(), CatalogError> {
        let mut dirs: Vec<&Path> = vec![&self.db_base_path, &self.upload_dir, &self.log_dir];
        if let Some(parent) = self.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                dirs.push(parent);
            }
        }

        for dir in dirs {
            if !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    CatalogError::config(format!(
                        "Failed to create directory {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(())
    }

    /// Get server bind address (host:port)
    pub fn server_bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Resolve a caller-supplied search limit
    ///
    /// `None` falls back to the default, zero is rejected, anything above
    /// the maximum is clamped.
    pub fn resolve_limit(&self, requested: Option<usize>) -> Result<usize, CatalogError> {
        match requested {
            None => Ok(self.default_search_limit),
            Some(0) => Err(CatalogError::invalid_input("limit must be a positive integer")),
            Some(n) => Ok(n.min(self.max_search_limit)),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.embedding_model.trim().is_empty() {
            return Err(CatalogError::config("Embedding model name cannot be empty"));
        }

        if self.embedding_backend == EmbeddingBackend::Http
            && !self.embedding_service_url.starts_with("http://")
            && !self.embedding_service_url.starts_with("https://")
        {
            return Err(CatalogError::config(
                "Embedding service URL must start with http:// or https://",
            ));
        }

        if self.embedding_dim == 0 {
            return Err(CatalogError::config("Embedding dimension cannot be 0"));
        }

        if self.embedding_backend == EmbeddingBackend::Histogram {
            if self.histogram_bins < 2 || self.histogram_bins > 16 {
                return Err(CatalogError::config("Histogram bins must be between 2 and 16"));
            }
            if self.embedding_dim != self.histogram_bins.pow(3) {
                return Err(CatalogError::config(format!(
                    "Histogram backend with {} bins produces {} dimensions, but EMBEDDING_DIM is {}",
                    self.histogram_bins,
                    self.histogram_bins.pow(3),
                    self.embedding_dim
                )));
            }
        }

        if self.server_port == 0 {
            return Err(CatalogError::config("Server port cannot be 0"));
        }

        if self.default_search_limit == 0 || self.max_search_limit == 0 {
            return Err(CatalogError::config("Search limits must be positive"));
        }

        if self.max_upload_bytes == 0 {
            return Err(CatalogError::config("Max upload size must be positive"));
        }

        if crate::logger::parse_log_level(&self.log_level).is_none() {
            return Err(CatalogError::config(format!(
                "Invalid log level '{}'",
                self.log_level
            )));
        }

        Ok(())
    }
}
