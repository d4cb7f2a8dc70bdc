use catalens_common::{CatalogError, Result};
use ndarray::ArrayView1;

/// Allowed deviation of a stored embedding's norm from 1.0
pub const UNIT_NORM_TOLERANCE: f32 = 1e-3;

/// Euclidean norm
pub fn l2_norm(v: &[f32]) -> f32 {
    let view = ArrayView1::from(v);
    view.dot(&view).sqrt()
}

/// Cosine similarity `(a·b) / (‖a‖·‖b‖)`
///
/// Inputs are not assumed to be normalized. Mismatched lengths are a
/// `DimensionMismatch`; a zero-norm side is a `DegenerateVector`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(CatalogError::dimension_mismatch(a.len(), b.len()));
    }

    let a = ArrayView1::from(a);
    let b = ArrayView1::from(b);

    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();
    let denom = norm_a * norm_b;
    if denom == 0.0 || !denom.is_finite() {
        return Err(CatalogError::degenerate(
            "cosine similarity is undefined for a zero-norm vector",
        ));
    }

    // Rounding can push the ratio just past ±1
    Ok((a.dot(&b) / denom).clamp(-1.0, 1.0))
}

/// Check the unit-length contract of the embedding provider
pub fn check_unit_norm(v: &[f32]) -> Result<()> {
    let norm = l2_norm(v);
    if norm == 0.0 {
        return Err(CatalogError::degenerate("embedding has zero norm"));
    }
    if !norm.is_finite() {
        return Err(CatalogError::invalid_input("embedding contains non-finite values"));
    }
    if (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
        return Err(CatalogError::invalid_input(format!(
            "embedding is not unit length (norm {:.6})",
            norm
        )));
    }
    Ok(())
}
