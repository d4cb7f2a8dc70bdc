use serde::{Deserialize, Serialize};

/// Embedding service response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    /// Feature vector
    pub embedding: Vec<f32>,

    /// Model that produced it, when the service reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Embedding service health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub dimension: Option<usize>,
}
