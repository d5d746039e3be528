//! Corpus store for Lectern.
//!
//! Holds every subtitle chunk together with a dense row-major matrix of their
//! embeddings (row i belongs to chunk i). A store is built once from a corpus
//! file and never mutated afterwards, so it is shared between requests
//! through an `Arc` without locking.

mod loader;

pub use loader::{load_corpus, parse_corpus, write_corpus, CorpusFile, CorpusSource};

use crate::error::CorpusError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// One timestamped subtitle segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Source video title.
    pub title: String,
    /// Video ordinal within the course.
    pub number: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Transcript text.
    pub text: String,
}

impl Chunk {
    /// Format the start timestamp for display.
    pub fn format_timestamp(&self) -> String {
        format_seconds(self.start)
    }
}

/// Render seconds as `MM:SS`, or `HH:MM:SS` past the hour.
pub fn format_seconds(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// A chunk as stored in a corpus file, embedding included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_number", deserialize_with = "string_or_number")]
    pub number: String,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl ChunkRecord {
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            title: chunk.title,
            number: chunk.number,
            start: chunk.start,
            end: chunk.end,
            text: chunk.text,
            embedding,
        }
    }

    fn into_parts(self) -> (Chunk, Vec<f32>) {
        (
            Chunk {
                title: self.title,
                number: self.number,
                start: self.start,
                end: self.end,
                text: self.text,
            },
            self.embedding,
        )
    }
}

pub(crate) fn default_title() -> String {
    "Unknown".to_string()
}

pub(crate) fn default_number() -> String {
    "N/A".to_string()
}

/// Video numbers show up both as `"3"` and `3` in subtitle exports.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}

/// Immutable, validated collection of chunks and their embeddings.
#[derive(Debug)]
pub struct CorpusStore {
    chunks: Vec<Chunk>,
    matrix: Vec<f32>,
    norms: Vec<f32>,
    dimensions: usize,
    model: Option<String>,
}

impl CorpusStore {
    /// Build a store from corpus records, enforcing the chunk invariants.
    pub fn from_records(
        records: Vec<ChunkRecord>,
        model: Option<String>,
    ) -> std::result::Result<Self, CorpusError> {
        Self::build(records, model, None)
    }

    pub(crate) fn build(
        records: Vec<ChunkRecord>,
        model: Option<String>,
        declared_dimensions: Option<usize>,
    ) -> std::result::Result<Self, CorpusError> {
        let first = records.first().ok_or(CorpusError::Empty)?;
        let dimensions = declared_dimensions.unwrap_or(first.embedding.len());

        let mut chunks = Vec::with_capacity(records.len());
        let mut matrix = Vec::with_capacity(records.len() * dimensions);
        let mut norms = Vec::with_capacity(records.len());

        for (index, record) in records.into_iter().enumerate() {
            validate_record(index, &record, dimensions)?;
            let (chunk, embedding) = record.into_parts();
            norms.push(l2_norm(&embedding));
            matrix.extend_from_slice(&embedding);
            chunks.push(chunk);
        }

        Ok(Self {
            chunks,
            matrix,
            norms,
            dimensions,
            model,
        })
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding dimensionality shared by every row.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embedding model recorded in the corpus file, if any.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    /// Embedding row for chunk `index`.
    pub fn row(&self, index: usize) -> &[f32] {
        let start = index * self.dimensions;
        &self.matrix[start..start + self.dimensions]
    }

    /// Precomputed L2 norm of row `index`.
    pub fn norm(&self, index: usize) -> f32 {
        self.norms[index]
    }

    /// Per-video overview of the corpus.
    pub fn summary(&self) -> CorpusSummary {
        let mut order: Vec<(String, String)> = Vec::new();
        let mut videos: HashMap<(String, String), VideoSummary> = HashMap::new();

        for chunk in &self.chunks {
            let key = (chunk.number.clone(), chunk.title.clone());
            let entry = videos.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                VideoSummary {
                    title: chunk.title.clone(),
                    number: chunk.number.clone(),
                    chunk_count: 0,
                    duration_seconds: 0.0,
                }
            });
            entry.chunk_count += 1;
            if chunk.end > entry.duration_seconds {
                entry.duration_seconds = chunk.end;
            }
        }

        CorpusSummary {
            chunk_count: self.len(),
            dimensions: self.dimensions,
            model: self.model.clone(),
            videos: order
                .into_iter()
                .filter_map(|key| videos.remove(&key))
                .collect(),
        }
    }
}

fn validate_record(
    index: usize,
    record: &ChunkRecord,
    dimensions: usize,
) -> std::result::Result<(), CorpusError> {
    let invalid = |reason: &str| CorpusError::InvalidChunk {
        index,
        reason: reason.to_string(),
    };

    if record.embedding.is_empty() {
        return Err(invalid("missing embedding"));
    }
    if record.embedding.len() != dimensions {
        return Err(CorpusError::DimensionMismatch {
            index,
            expected: dimensions,
            actual: record.embedding.len(),
        });
    }
    if record.embedding.iter().any(|v| !v.is_finite()) {
        return Err(invalid("embedding contains non-finite values"));
    }
    if record.text.trim().is_empty() {
        return Err(invalid("empty text"));
    }
    if !(record.start.is_finite() && record.end.is_finite()) || record.start < 0.0 {
        return Err(invalid("timestamps must be finite and non-negative"));
    }
    if record.start > record.end {
        return Err(invalid("start is after end"));
    }
    Ok(())
}

pub(crate) fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Summary information about one video in the corpus.
#[derive(Debug, Clone, Serialize)]
pub struct VideoSummary {
    pub title: String,
    pub number: String,
    pub chunk_count: usize,
    /// Latest chunk end time, in seconds.
    pub duration_seconds: f64,
}

/// Summary of a loaded corpus.
#[derive(Debug, Clone, Serialize)]
pub struct CorpusSummary {
    pub chunk_count: usize,
    pub dimensions: usize,
    pub model: Option<String>,
    pub videos: Vec<VideoSummary>,
}

/// Process-wide corpus state, fixed at startup.
///
/// A failed load leaves the service running in the `Unavailable` state until
/// it is restarted with a valid corpus.
#[derive(Debug, Clone)]
pub enum CorpusHandle {
    Ready(Arc<CorpusStore>),
    Unavailable { reason: String },
}

impl CorpusHandle {
    pub fn ready(store: CorpusStore) -> Self {
        Self::Ready(Arc::new(store))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn store(&self) -> Option<&Arc<CorpusStore>> {
        match self {
            Self::Ready(store) => Some(store),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(title: &str, text: &str, start: f64, embedding: Vec<f32>) -> ChunkRecord {
        ChunkRecord {
            title: title.to_string(),
            number: "1".to_string(),
            start,
            end: start + 10.0,
            text: text.to_string(),
            embedding,
        }
    }

    pub(crate) fn store_from(embeddings: Vec<Vec<f32>>) -> CorpusStore {
        let records = embeddings
            .into_iter()
            .enumerate()
            .map(|(i, e)| record("Video", &format!("chunk {}", i), i as f64 * 10.0, e))
            .collect();
        CorpusStore::from_records(records, None).unwrap()
    }

    #[test]
    fn test_store_rows_match_chunks() {
        let store = store_from(vec![vec![1.0, 0.0], vec![0.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.dimensions(), 2);
        assert_eq!(store.row(1), &[0.0, 2.0]);
        assert_eq!(store.chunk(2).unwrap().text, "chunk 2");
        assert!((store.norm(2) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let records = vec![
            record("A", "one", 0.0, vec![1.0, 0.0]),
            record("A", "two", 5.0, vec![1.0, 0.0, 0.0]),
        ];
        let err = CorpusStore::from_records(records, None).unwrap_err();
        assert_eq!(
            err,
            CorpusError::DimensionMismatch {
                index: 1,
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn test_invalid_chunks_rejected() {
        let err = CorpusStore::from_records(vec![record("A", "text", 0.0, vec![])], None).unwrap_err();
        assert!(matches!(err, CorpusError::InvalidChunk { index: 0, .. }));

        let err = CorpusStore::from_records(vec![record("A", "   ", 0.0, vec![1.0])], None).unwrap_err();
        assert!(matches!(err, CorpusError::InvalidChunk { index: 0, .. }));

        let mut backwards = record("A", "text", 20.0, vec![1.0]);
        backwards.end = 10.0;
        let err = CorpusStore::from_records(vec![backwards], None).unwrap_err();
        assert!(matches!(err, CorpusError::InvalidChunk { index: 0, .. }));

        assert_eq!(
            CorpusStore::from_records(Vec::new(), None).unwrap_err(),
            CorpusError::Empty
        );
    }

    #[test]
    fn test_summary_groups_by_video() {
        let mut records = vec![
            record("Hello Window", "a", 0.0, vec![1.0]),
            record("Hello Window", "b", 10.0, vec![1.0]),
            record("Shaders", "c", 0.0, vec![1.0]),
        ];
        records[2].number = "5".to_string();

        let summary = CorpusStore::from_records(records, Some("embed-english-v3.0".into()))
            .unwrap()
            .summary();
        assert_eq!(summary.chunk_count, 3);
        assert_eq!(summary.videos.len(), 2);
        assert_eq!(summary.videos[0].title, "Hello Window");
        assert_eq!(summary.videos[0].chunk_count, 2);
        assert_eq!(summary.videos[0].duration_seconds, 20.0);
        assert_eq!(summary.videos[1].number, "5");
    }

    #[test]
    fn test_number_accepts_strings_and_numbers() {
        let json = r#"[
            {"title": "A", "number": 3, "start": 0, "end": 1, "text": "x", "embedding": [1.0]},
            {"title": "B", "number": "12", "start": 0, "end": 1, "text": "y", "embedding": [1.0]},
            {"start": 0, "end": 1, "text": "z", "embedding": [1.0]}
        ]"#;
        let records: Vec<ChunkRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records[0].number, "3");
        assert_eq!(records[1].number, "12");
        assert_eq!(records[2].number, "N/A");
        assert_eq!(records[2].title, "Unknown");
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(format_seconds(125.0), "02:05");
        assert_eq!(format_seconds(3725.4), "01:02:05");
    }

    #[test]
    fn test_handle_state() {
        let handle = CorpusHandle::unavailable("no file");
        assert!(!handle.is_ready());
        assert!(handle.store().is_none());

        let handle = CorpusHandle::ready(store_from(vec![vec![1.0]]));
        assert!(handle.is_ready());
    }
}
