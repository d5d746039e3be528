//! Context assembly: ranked chunks to a bounded, prompt-ready structure.

use crate::corpus::format_seconds;
use crate::ranking::RankedResult;
use serde::Serialize;

/// Default per-chunk text limit, in characters.
pub const DEFAULT_MAX_TEXT_CHARS: usize = 1000;

/// One retrieved chunk as handed to the generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextEntry {
    pub title: String,
    pub number: String,
    pub start: f64,
    pub end: f64,
    /// Chunk text, cut to the assembler's limit.
    pub text: String,
    #[serde(skip)]
    pub score: f32,
    #[serde(skip)]
    pub index: usize,
}

impl ContextEntry {
    /// Format the start timestamp for display.
    pub fn format_timestamp(&self) -> String {
        format_seconds(self.start)
    }
}

/// Ordered, bounded set of entries for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Context {
    entries: Vec<ContextEntry>,
}

impl Context {
    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON records (`title, number, start, end, text`) in rank order.
    pub fn to_records_json(&self) -> String {
        serde_json::to_string(&self.entries).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn into_entries(self) -> Vec<ContextEntry> {
        self.entries
    }
}

/// Projects ranked results into a [`Context`].
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    max_text_chars: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TEXT_CHARS)
    }
}

impl ContextAssembler {
    pub fn new(max_text_chars: usize) -> Self {
        Self { max_text_chars }
    }

    pub fn max_text_chars(&self) -> usize {
        self.max_text_chars
    }

    /// Build the context, keeping rank order. No score threshold is applied.
    pub fn build(&self, results: &[RankedResult<'_>]) -> Context {
        let entries = results
            .iter()
            .map(|r| ContextEntry {
                title: r.chunk.title.clone(),
                number: r.chunk.number.clone(),
                start: r.chunk.start,
                end: r.chunk.end,
                text: truncate_chars(&r.chunk.text, self.max_text_chars).to_string(),
                score: r.score,
                index: r.index,
            })
            .collect();
        Context { entries }
    }
}

/// Keep the first `max_chars` characters of `text`.
///
/// A plain prefix cut: it does not look for word boundaries. Prompts built from
/// the same corpus must stay byte-identical, so keep it that way.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::tests::record;
    use crate::corpus::CorpusStore;
    use crate::ranking::{CosineRanker, RankQuery, Ranker};

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello world", 5), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hi", 5), "hi");
        assert_eq!(truncate_chars("", 5), "");
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_build_bounds_text_and_keeps_order() {
        let long = "x".repeat(1500);
        let records = vec![
            record("Short", "glBindBuffer binds a buffer", 0.0, vec![0.5, 0.5]),
            record("Long", &long, 60.0, vec![1.0, 0.0]),
        ];
        let store = CorpusStore::from_records(records, None).unwrap();
        let ranked = CosineRanker
            .top_k(&store, &RankQuery::new("q", Some(&[1.0, 0.0])), 2)
            .unwrap();

        let context = ContextAssembler::default().build(&ranked);
        assert_eq!(context.len(), 2);
        assert_eq!(context.entries()[0].title, "Long");
        assert_eq!(context.entries()[0].text.chars().count(), 1000);
        assert_eq!(context.entries()[1].text, "glBindBuffer binds a buffer");
        assert_eq!(context.entries()[0].format_timestamp(), "01:00");

        for entry in context.entries() {
            assert!(entry.text.chars().count() <= 1000);
        }
    }

    #[test]
    fn test_records_json_shape() {
        let store = CorpusStore::from_records(
            vec![record("Hello Triangle", "vertices", 12.5, vec![1.0])],
            None,
        )
        .unwrap();
        let ranked = CosineRanker
            .top_k(&store, &RankQuery::new("q", Some(&[1.0])), 1)
            .unwrap();
        let json = ContextAssembler::new(4).build(&ranked).to_records_json();

        assert_eq!(
            json,
            r#"[{"title":"Hello Triangle","number":"1","start":12.5,"end":22.5,"text":"vert"}]"#
        );
    }

    #[test]
    fn test_empty_input() {
        let context = ContextAssembler::default().build(&[]);
        assert!(context.is_empty());
        assert_eq!(context.to_records_json(), "[]");
    }
}
