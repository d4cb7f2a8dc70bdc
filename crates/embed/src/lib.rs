//! Catalens embedding providers
//!
//! Image decoding and the providers that turn a decoded image into a
//! unit-length feature vector.

mod client;
mod histogram;
mod decode;
mod provider;
mod types;

pub use client::HttpEmbeddingClient;
pub use histogram::ColorHistogramEmbedder;
pub use decode::{decode_image, is_image_content_type, DecodedImage};
pub use provider::{build_provider, EmbeddingProvider};
pub use types::{EmbedResponse, ServiceHealth};
