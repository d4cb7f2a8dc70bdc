use serde::Serialize;

/// One ranked candidate
#[derive(Debug, Clone, Serialize)]
pub struct Ranked<T> {
    /// The candidate, as handed to the ranker
    pub item: T,

    /// Cosine similarity to the query (-1.0 to 1.0)
    pub score: f32,
}

/// Result of a top-K ranking
#[derive(Debug, Clone, Serialize)]
pub struct Ranking<T> {
    /// Best hits, descending by score, at most K long
    pub hits: Vec<Ranked<T>>,

    /// Number of candidates scored, before truncation
    pub total_candidates: usize,
}

impl<T> Ranking<T> {
    pub fn empty() -> Self {
        Self {
            hits: Vec::new(),
            total_candidates: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Transform the carried items, keeping scores and order
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Ranking<U> {
        Ranking {
            hits: self
                .hits
                .into_iter()
                .map(|r| Ranked {
                    item: f(r.item),
                    score: r.score,
                })
                .collect(),
            total_candidates: self.total_candidates,
        }
    }
}
