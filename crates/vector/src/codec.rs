//! Embedding blob encoding.
//!
//! Layout: a little-endian `u32` element count followed by that many
//! little-endian `f32` values.

use catalens_common::{CatalogError, Result};

const PREFIX_LEN: usize = std::mem::size_of::<u32>();
const VALUE_LEN: usize = std::mem::size_of::<f32>();

/// Encode an embedding as a length-prefixed blob
pub fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(PREFIX_LEN + std::mem::size_of_val(vector));
    bytes.extend_from_slice(&(vector.len() as u32).to_le_bytes());
    for &value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode a blob, requiring exactly `dimension` finite values
pub fn decode_embedding(blob: &[u8], dimension: usize) -> Result<Vec<f32>> {
    if blob.len() < PREFIX_LEN {
        return Err(CatalogError::storage(format!(
            "embedding blob too short: {} bytes",
            blob.len()
        )));
    }

    let (prefix, body) = blob.split_at(PREFIX_LEN);
    let count = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    if count != dimension {
        return Err(CatalogError::dimension_mismatch(dimension, count));
    }

    let expected_len = count
        .checked_mul(VALUE_LEN)
        .ok_or_else(|| CatalogError::storage("embedding blob length overflow"))?;
    if body.len() != expected_len {
        return Err(CatalogError::storage(format!(
            "invalid embedding byte length: expected {}, got {}",
            expected_len,
            body.len()
        )));
    }

    let mut out = Vec::with_capacity(count);
    for chunk in body.chunks_exact(VALUE_LEN) {
        let value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        if !value.is_finite() {
            return Err(CatalogError::storage("embedding contains non-finite values"));
        }
        out.push(value);
    }
    Ok(out)
}
