//! Catalens vector operations
//!
//! Cosine similarity, exhaustive top-K ranking and the on-disk encoding of
//! embeddings.

mod codec;
mod ranker;
mod similarity;
mod types;

pub use codec::{decode_embedding, encode_embedding};
pub use ranker::{rank, DEFAULT_TOP_K};
pub use similarity::{check_unit_norm, cosine_similarity, l2_norm, UNIT_NORM_TOLERANCE};
pub use types::{Ranked, Ranking};
