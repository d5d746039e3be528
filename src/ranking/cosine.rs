//! Exact cosine-similarity ranking over the corpus matrix.

use super::{select_top, RankQuery, RankedResult, Ranker, RankingError};
use crate::corpus::{l2_norm, CorpusStore};

/// Compute cosine similarity between two vectors.
///
/// Zero-norm or mismatched vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    cosine_with_norms(a, l2_norm(a), b, l2_norm(b))
}

fn cosine_with_norms(a: &[f32], norm_a: f32, b: &[f32], norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let score = dot_product / (norm_a * norm_b);
    if score.is_finite() {
        score.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Brute-force cosine ranker, O(n·d) per query.
#[derive(Debug, Default, Clone, Copy)]
pub struct CosineRanker;

impl Ranker for CosineRanker {
    fn name(&self) -> &'static str {
        "cosine"
    }

    fn requires_embedding(&self) -> bool {
        true
    }

    fn top_k<'c>(
        &self,
        corpus: &'c CorpusStore,
        query: &RankQuery<'_>,
        k: usize,
    ) -> Result<Vec<RankedResult<'c>>, RankingError> {
        let vector = query.vector.ok_or(RankingError::MissingQueryVector)?;
        if vector.len() != corpus.dimensions() {
            return Err(RankingError::DimensionMismatch {
                expected: corpus.dimensions(),
                actual: vector.len(),
            });
        }

        let query_norm = l2_norm(vector);
        let scored = (0..corpus.len())
            .map(|i| (i, cosine_with_norms(vector, query_norm, corpus.row(i), corpus.norm(i))))
            .collect();

        Ok(select_top(corpus, scored, k))
    }
}
