//! Offline corpus builder.
//!
//! Reads a folder of subtitle JSON files, embeds every chunk and writes the
//! result as a corpus file the server can load.

use crate::corpus::{default_number, default_title, string_or_number, write_corpus, Chunk, ChunkRecord, CorpusFile};
use crate::embedding::{EmbedPurpose, Embedder};
use crate::error::{LecternError, Result};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One subtitle export: `{title, number, chunks: [{start, end, text}]}`.
#[derive(Debug, Deserialize)]
struct SubtitleFile {
    #[serde(default)]
    title: Option<String>,
    #[serde(default, deserialize_with = "optional_number")]
    number: Option<String>,
    #[serde(default)]
    chunks: Vec<SubtitleChunk>,
}

#[derive(Debug, Deserialize)]
struct SubtitleChunk {
    #[serde(default)]
    title: Option<String>,
    #[serde(default, deserialize_with = "optional_number")]
    number: Option<String>,
    #[serde(default)]
    start: f64,
    #[serde(default)]
    end: f64,
    #[serde(default)]
    text: String,
}

fn optional_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "string_or_number")] String);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(s)| s))
}

/// Chunks gathered from a subtitle folder.
#[derive(Debug, Default)]
pub struct CollectedChunks {
    pub chunks: Vec<Chunk>,
    pub files: usize,
    pub skipped: usize,
}

/// Summary of a finished indexing run.
#[derive(Debug, Clone)]
pub struct IndexReport {
    pub files: usize,
    pub chunks: usize,
    pub skipped: usize,
    pub dimensions: usize,
    pub output: PathBuf,
}

/// Read every `*.json` file in `dir`, in file-name order.
///
/// Chunk-level `title` and `number` override the file-level ones. Chunks with
/// blank text are skipped.
pub fn collect_chunks(dir: &Path) -> Result<CollectedChunks> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut collected = CollectedChunks::default();
    for path in paths {
        let content = std::fs::read(&path)?;
        let file: SubtitleFile = serde_json::from_slice(&content).map_err(|e| {
            LecternError::Index(format!("{}: {}", path.display(), e))
        })?;

        let file_title = file.title.unwrap_or_else(default_title);
        let file_number = file.number.unwrap_or_else(default_number);

        for (i, chunk) in file.chunks.into_iter().enumerate() {
            if chunk.text.trim().is_empty() {
                debug!("Skipping empty chunk {} in {}", i, path.display());
                collected.skipped += 1;
                continue;
            }
            collected.chunks.push(Chunk {
                title: chunk.title.unwrap_or_else(|| file_title.clone()),
                number: chunk.number.unwrap_or_else(|| file_number.clone()),
                start: chunk.start,
                end: chunk.end,
                text: chunk.text,
            });
        }
        collected.files += 1;
    }

    if collected.skipped > 0 {
        warn!("Skipped {} chunks with empty text", collected.skipped);
    }
    Ok(collected)
}

/// Join each run of `group` consecutive chunks of the same video into one.
///
/// The merged chunk takes the first chunk's start, the last chunk's end and
/// the texts joined by a space. A `group` of 0 or 1 leaves the chunks as is.
pub fn merge_chunks(chunks: Vec<Chunk>, group: usize) -> Vec<Chunk> {
    if group <= 1 {
        return chunks;
    }

    let mut merged: Vec<Chunk> = Vec::new();
    let mut run = 0;
    for chunk in chunks {
        let same_video = merged
            .last()
            .is_some_and(|last| last.title == chunk.title && last.number == chunk.number);

        match merged.last_mut() {
            Some(last) if same_video && run < group => {
                last.end = chunk.end;
                last.text.push(' ');
                last.text.push_str(&chunk.text);
                run += 1;
            }
            _ => {
                merged.push(chunk);
                run = 1;
            }
        }
    }
    merged
}

/// Embeds chunks in batches and assembles the corpus file.
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    max_concurrent: usize,
}

impl Indexer {
    pub fn new(embedder: Arc<dyn Embedder>, batch_size: usize, max_concurrent: usize) -> Self {
        Self {
            embedder,
            batch_size: batch_size.max(1),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Embed `chunks` and return the corpus file contents.
    ///
    /// Batches run concurrently but results are kept in input order. The first
    /// failed batch aborts the whole run.
    #[instrument(skip(self, chunks, progress), fields(chunks = chunks.len()))]
    pub async fn embed_chunks(&self, chunks: Vec<Chunk>, progress: Option<&ProgressBar>) -> Result<CorpusFile> {
        if chunks.is_empty() {
            return Err(LecternError::Index("no chunks with text to index".to_string()));
        }

        let batches: Vec<Vec<String>> = chunks
            .chunks(self.batch_size)
            .map(|batch| batch.iter().map(|c| c.text.clone()).collect())
            .collect();
        info!(
            batches = batches.len(),
            batch_size = self.batch_size,
            "Embedding {} chunks with {}",
            chunks.len(),
            self.embedder.model()
        );

        let embedder = &self.embedder;
        let mut results = stream::iter(batches.into_iter().enumerate())
            .map(|(i, texts)| async move {
                let vectors = embedder.embed(&texts, EmbedPurpose::SearchDocument).await;
                (i, texts.len(), vectors)
            })
            .buffered(self.max_concurrent);

        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
        while let Some((i, expected, vectors)) = results.next().await {
            let vectors = vectors.map_err(|e| LecternError::Index(format!("batch {} failed: {}", i, e)))?;
            if vectors.len() != expected {
                return Err(LecternError::Index(format!(
                    "batch {} returned {} embeddings for {} chunks",
                    i,
                    vectors.len(),
                    expected
                )));
            }
            embeddings.extend(vectors);
            if let Some(pb) = progress {
                pb.inc(expected as u64);
            }
        }

        let dimensions = embeddings.first().map(Vec::len);
        let records = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| ChunkRecord::new(chunk, embedding))
            .collect();

        Ok(CorpusFile {
            model: Some(self.embedder.model().to_string()),
            dimensions,
            created_at: Some(Utc::now()),
            chunks: records,
        })
    }

    /// Index `dir` into `output`.
    pub async fn run(
        &self,
        dir: &Path,
        output: &Path,
        merge: usize,
        progress: Option<&ProgressBar>,
    ) -> Result<IndexReport> {
        let collected = collect_chunks(dir)?;
        let chunks = merge_chunks(collected.chunks, merge);
        info!("Loaded {} chunks from {} files", chunks.len(), collected.files);

        if let Some(pb) = progress {
            pb.set_length(chunks.len() as u64);
        }
        let file = self.embed_chunks(chunks, progress).await?;
        write_corpus(output, &file)?;

        Ok(IndexReport {
            files: collected.files,
            chunks: file.chunks.len(),
            skipped: collected.skipped,
            dimensions: file.dimensions.unwrap_or(0),
            output: output.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::parse_corpus;
    use crate::error::ProviderError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Embeds each text as `[len, first byte]`, finishing early batches last.
    struct LengthEmbedder {
        calls: AtomicUsize,
        fail_on_call: Option<usize>,
    }

    impl LengthEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on_call: None,
            }
        }
    }

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed(&self, texts: &[String], purpose: EmbedPurpose) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
            assert_eq!(purpose, EmbedPurpose::SearchDocument);
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_call == Some(call) {
                return Err(ProviderError::rate_limited("fake"));
            }
            if call == 0 {
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
            Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32, t.as_bytes()[0] as f32])
                .collect())
        }

        fn name(&self) -> &'static str {
            "fake"
        }

        fn model(&self) -> &str {
            "fake-embed"
        }
    }

    fn write(dir: &TempDir, name: &str, content: &str) {
        std::fs::write(dir.path().join(name), content).unwrap();
    }

    fn subtitle_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "01_hello.json",
            r#"{"title": "Hello Triangle", "number": 1, "chunks": [
                {"start": 0, "end": 4.5, "text": "a"},
                {"start": 4.5, "end": 9, "text": "   "},
                {"start": 9, "end": 12, "text": "bb"}
            ]}"#,
        );
        write(
            &dir,
            "02_shaders.json",
            r#"{"number": "2", "chunks": [
                {"title": "Shaders", "start": 0, "end": 3, "text": "ccc"},
                {"start": 3, "end": 7, "text": "dddd"},
                {"start": 7, "end": 8, "text": "eeeee"}
            ]}"#,
        );
        write(&dir, "notes.txt", "ignored");
        dir
    }

    #[test]
    fn test_collect_applies_file_defaults() {
        let dir = subtitle_dir();
        let collected = collect_chunks(dir.path()).unwrap();

        assert_eq!(collected.files, 2);
        assert_eq!(collected.skipped, 1);
        let texts: Vec<&str> = collected.chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "bb", "ccc", "dddd", "eeeee"]);
        assert_eq!(collected.chunks[0].number, "1");
        assert_eq!(collected.chunks[2].title, "Shaders");
        assert_eq!(collected.chunks[3].title, "Unknown");
        assert_eq!(collected.chunks[3].number, "2");
    }

    #[test]
    fn test_merge_groups_within_video() {
        let collected = collect_chunks(subtitle_dir().path()).unwrap();
        let merged = merge_chunks(collected.chunks, 2);

        let texts: Vec<&str> = merged.iter().map(|c| c.text.as_str()).collect();
        // "ccc" and "dddd" differ in title, so they stay apart.
        assert_eq!(texts, vec!["a bb", "ccc", "dddd eeeee"]);
        assert_eq!(merged[0].start, 0.0);
        assert_eq!(merged[0].end, 12.0);
    }

    #[tokio::test]
    async fn test_index_preserves_order_across_concurrent_batches() {
        let dir = subtitle_dir();
        let out = TempDir::new().unwrap();
        let output = out.path().join("corpus").join("embeddings.json");

        let indexer = Indexer::new(Arc::new(LengthEmbedder::new()), 2, 3);
        let report = indexer.run(dir.path(), &output, 1, None).await.unwrap();
        assert_eq!(report.chunks, 5);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.dimensions, 2);

        let store = parse_corpus(&std::fs::read(&output).unwrap(), "test").unwrap();
        assert_eq!(store.model(), Some("fake-embed"));
        for (i, chunk) in store.chunks().iter().enumerate() {
            assert_eq!(store.row(i)[0], chunk.text.len() as f32);
        }
        assert!(!output.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_failed_batch_aborts_without_output() {
        let dir = subtitle_dir();
        let out = TempDir::new().unwrap();
        let output = out.path().join("embeddings.json");

        let embedder = LengthEmbedder {
            calls: AtomicUsize::new(0),
            fail_on_call: Some(1),
        };
        let indexer = Indexer::new(Arc::new(embedder), 2, 1);
        let err = indexer.run(dir.path(), &output, 1, None).await.unwrap_err();
        assert!(err.to_string().contains("batch 1"));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_empty_folder_is_an_error() {
        let dir = TempDir::new().unwrap();
        let indexer = Indexer::new(Arc::new(LengthEmbedder::new()), 2, 1);
        let err = indexer
            .run(dir.path(), &dir.path().join("out.json"), 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LecternError::Index(_)));
    }
}
