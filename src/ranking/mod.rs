//! Ranking of corpus chunks against a query.
//!
//! Every strategy implements [`Ranker`]: score each chunk, order by score
//! descending with ties kept in corpus order, and return the best `k`.

mod cosine;
mod lexical;

pub use cosine::{cosine_similarity, CosineRanker};
pub use lexical::LexicalRanker;

use crate::config::RankerKind;
use crate::corpus::{Chunk, CorpusStore};
use std::sync::Arc;
use thiserror::Error;

/// Failure to rank the corpus against a query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RankingError {
    #[error("ranker requires a query embedding but none was provided")]
    MissingQueryVector,

    #[error("query embedding has {actual} dimensions but the corpus has {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Query as seen by a ranker.
#[derive(Debug, Clone, Copy)]
pub struct RankQuery<'a> {
    pub text: &'a str,
    pub vector: Option<&'a [f32]>,
}

impl<'a> RankQuery<'a> {
    pub fn new(text: &'a str, vector: Option<&'a [f32]>) -> Self {
        Self { text, vector }
    }
}

/// A chunk with its score for one query.
#[derive(Debug, Clone, Copy)]
pub struct RankedResult<'c> {
    /// Row index in the corpus.
    pub index: usize,
    /// Similarity score (higher is better).
    pub score: f32,
    pub chunk: &'c Chunk,
}

/// Top-K retrieval strategy.
pub trait Ranker: Send + Sync {
    /// Strategy name, used in logs.
    fn name(&self) -> &'static str;

    /// Whether the query must be embedded before ranking.
    fn requires_embedding(&self) -> bool;

    /// Return at most `k` results, best first.
    fn top_k<'c>(
        &self,
        corpus: &'c CorpusStore,
        query: &RankQuery<'_>,
        k: usize,
    ) -> Result<Vec<RankedResult<'c>>, RankingError>;
}

/// Build the ranker selected in settings.
pub fn create_ranker(kind: RankerKind) -> Arc<dyn Ranker> {
    match kind {
        RankerKind::Cosine => Arc::new(CosineRanker),
        RankerKind::Lexical => Arc::new(LexicalRanker),
    }
}

/// Sort `(index, score)` pairs best first, keep the first `k` and attach chunks.
///
/// The sort is stable, so equal scores stay in corpus order.
fn select_top<'c>(corpus: &'c CorpusStore, mut scored: Vec<(usize, f32)>, k: usize) -> Vec<RankedResult<'c>> {
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);
    scored
        .into_iter()
        .filter_map(|(index, score)| {
            corpus.chunk(index).map(|chunk| RankedResult { index, score, chunk })
        })
        .collect()
}
