use catalens_common::{CatalogError, Result};
use std::cmp::Ordering;
use tracing::debug;

use crate::similarity::cosine_similarity;
use crate::types::{Ranked, Ranking};

/// Number of hits returned when the caller does not choose
pub const DEFAULT_TOP_K: usize = 10;

/// Rank candidates by cosine similarity to `query` and keep the best `top_k`
///
/// This is an exhaustive scan, O(n·d) per query with no index. Every
/// candidate must share the query's dimensionality; a mismatch fails the
/// whole ranking rather than skipping the record. Ties keep their input
/// order.
pub fn rank<T, E>(query: &[f32], candidates: Vec<(T, E)>, top_k: usize) -> Result<Ranking<T>>
where
    E: AsRef<[f32]>,
{
    if top_k == 0 {
        return Err(CatalogError::invalid_input("top_k must be a positive integer"));
    }
    if query.is_empty() {
        return Err(CatalogError::degenerate("query embedding is empty"));
    }

    let total_candidates = candidates.len();

    let mut hits = Vec::with_capacity(total_candidates);
    for (item, embedding) in candidates {
        let embedding = embedding.as_ref();
        if embedding.len() != query.len() {
            return Err(CatalogError::dimension_mismatch(query.len(), embedding.len()));
        }
        let score = cosine_similarity(query, embedding)?;
        hits.push(Ranked { item, score });
    }

    // sort_by is stable, so equal scores stay in input order
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    hits.truncate(top_k);

    debug!(
        "Ranking completed - {} hits from {} candidates",
        hits.len(),
        total_candidates
    );

    Ok(Ranking {
        hits,
        total_candidates,
    })
}
