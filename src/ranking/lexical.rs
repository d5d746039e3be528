//! Keyword-overlap ranking, for running without an embedding provider.

use super::{select_top, RankQuery, RankedResult, Ranker, RankingError};
use crate::corpus::CorpusStore;

/// Scores a chunk by how many query terms appear in its text.
///
/// Terms are the lowercase whitespace-separated words of the query, matched
/// as substrings of the lowercase chunk text. Repeated terms count each time.
/// Chunks that match no term are left out.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalRanker;

impl Ranker for LexicalRanker {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn requires_embedding(&self) -> bool {
        false
    }

    fn top_k<'c>(
        &self,
        corpus: &'c CorpusStore,
        query: &RankQuery<'_>,
        k: usize,
    ) -> Result<Vec<RankedResult<'c>>, RankingError> {
        let query = query.text.to_lowercase();
        let terms: Vec<&str> = query.split_whitespace().collect();

        let scored = corpus
            .chunks()
            .iter()
            .enumerate()
            .filter_map(|(i, chunk)| {
                let text = chunk.text.to_lowercase();
                let hits = terms.iter().filter(|term| text.contains(*term)).count();
                (hits > 0).then_some((i, hits as f32))
            })
            .collect();

        Ok(select_top(corpus, scored, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::tests::record;
    use crate::corpus::CorpusStore;

    fn store(texts: &[&str]) -> CorpusStore {
        let records = texts
            .iter()
            .enumerate()
            .map(|(i, t)| record("Video", t, i as f64, vec![1.0]))
            .collect();
        CorpusStore::from_records(records, None).unwrap()
    }

    #[test]
    fn test_counts_term_hits() {
        let store = store(&[
            "We draw our first triangle",
            "Vertex shaders transform each vertex of the triangle",
            "Textures are sampled in the fragment shader",
        ]);

        let results = LexicalRanker
            .top_k(&store, &RankQuery::new("Triangle SHADER", None), 5)
            .unwrap();
        let got: Vec<(usize, f32)> = results.iter().map(|r| (r.index, r.score)).collect();
        assert_eq!(got, vec![(1, 2.0), (0, 1.0), (2, 1.0)]);
    }

    #[test]
    fn test_no_match_returns_nothing() {
        let store = store(&["Hello window"]);
        let results = LexicalRanker
            .top_k(&store, &RankQuery::new("quaternions", None), 5)
            .unwrap();
        assert!(results.is_empty());

        let results = LexicalRanker.top_k(&store, &RankQuery::new("   ", None), 5).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_respects_k() {
        let store = store(&["a shader", "b shader", "c shader"]);
        let results = LexicalRanker
            .top_k(&store, &RankQuery::new("shader", None), 2)
            .unwrap();
        let order: Vec<usize> = results.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![0, 1]);
    }
}
