//! Corpus file loading (local path or remote URL) and writing.

use super::{ChunkRecord, CorpusHandle, CorpusStore};
use crate::config::CorpusSettings;
use crate::config::Settings;
use crate::error::{CorpusError, LecternError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, instrument};
use url::Url;

/// On-disk corpus document produced by the indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusFile {
    /// Embedding model that produced the vectors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Embedding dimensionality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub chunks: Vec<ChunkRecord>,
}

/// Where a corpus file is read from.
#[derive(Debug, Clone, PartialEq)]
pub enum CorpusSource {
    Path(PathBuf),
    Url(Url),
}

impl CorpusSource {
    /// Pick the source from settings. A configured URL wins over the local path.
    pub fn from_settings(settings: &CorpusSettings) -> Result<Self> {
        match settings.url.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                let url = Url::parse(raw)
                    .map_err(|e| LecternError::Config(format!("Invalid corpus URL '{}': {}", raw, e)))?;
                match url.scheme() {
                    "http" | "https" => Ok(Self::Url(url)),
                    other => Err(LecternError::Config(format!(
                        "Unsupported corpus URL scheme '{}'",
                        other
                    ))),
                }
            }
            _ => Ok(Self::Path(Settings::expand_path(&settings.path))),
        }
    }

    /// Human-readable name for logs and errors.
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Url(url) => url.to_string(),
        }
    }

    async fn fetch(&self, timeout: Duration) -> std::result::Result<Vec<u8>, CorpusError> {
        let read_error = |message: String| CorpusError::Read {
            source_name: self.describe(),
            message,
        };

        match self {
            Self::Path(path) => tokio::fs::read(path)
                .await
                .map_err(|e| read_error(e.to_string())),
            Self::Url(url) => {
                let client = reqwest::Client::builder()
                    .timeout(timeout)
                    .build()
                    .map_err(|e| read_error(e.to_string()))?;
                let response = client
                    .get(url.clone())
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| read_error(e.to_string()))?;
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| read_error(e.to_string()))?;
                Ok(bytes.to_vec())
            }
        }
    }

    /// Read and validate the corpus.
    #[instrument(skip(self), fields(source = %self.describe()))]
    pub async fn load(&self, timeout: Duration) -> std::result::Result<CorpusStore, CorpusError> {
        let bytes = self.fetch(timeout).await?;
        parse_corpus(&bytes, &self.describe())
    }
}

/// Parse a corpus document. Accepts a `CorpusFile` object or a bare array of
/// chunk records.
pub fn parse_corpus(bytes: &[u8], source_name: &str) -> std::result::Result<CorpusStore, CorpusError> {
    let parse_error = |e: serde_json::Error| CorpusError::Parse {
        source_name: source_name.to_string(),
        message: e.to_string(),
    };

    let value: serde_json::Value = serde_json::from_slice(bytes).map_err(parse_error)?;
    if value.is_array() {
        let records: Vec<ChunkRecord> = serde_json::from_value(value).map_err(parse_error)?;
        CorpusStore::build(records, None, None)
    } else {
        let file: CorpusFile = serde_json::from_value(value).map_err(parse_error)?;
        CorpusStore::build(file.chunks, file.model, file.dimensions)
    }
}

/// Load the configured corpus. Never fails: a load error is logged and turned
/// into [`CorpusHandle::Unavailable`].
pub async fn load_corpus(settings: &CorpusSettings) -> CorpusHandle {
    let source = match CorpusSource::from_settings(settings) {
        Ok(source) => source,
        Err(e) => {
            error!("Corpus unavailable: {}", e);
            return CorpusHandle::unavailable(e.to_string());
        }
    };

    info!("Loading corpus from {}", source.describe());
    match source
        .load(Duration::from_secs(settings.download_timeout_secs))
        .await
    {
        Ok(store) => {
            info!(
                chunks = store.len(),
                dimensions = store.dimensions(),
                "Loaded {} subtitle chunks",
                store.len()
            );
            CorpusHandle::ready(store)
        }
        Err(e) => {
            error!("Corpus unavailable: {}", e);
            CorpusHandle::unavailable(e.to_string())
        }
    }
}

/// Write a corpus file, replacing any existing file only once the new one is
/// fully written.
pub fn write_corpus(path: &Path, file: &CorpusFile) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    let content = serde_json::to_vec(file)?;
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::tests::record;

    fn settings_for(path: &Path) -> CorpusSettings {
        CorpusSettings {
            path: path.to_string_lossy().to_string(),
            url: None,
            download_timeout_secs: 5,
        }
    }

    #[test]
    fn test_source_selection() {
        let mut settings = CorpusSettings::default();
        assert!(matches!(
            CorpusSource::from_settings(&settings).unwrap(),
            CorpusSource::Path(_)
        ));

        settings.url = Some("https://example.com/embeddings.json".to_string());
        assert!(matches!(
            CorpusSource::from_settings(&settings).unwrap(),
            CorpusSource::Url(_)
        ));

        settings.url = Some("ftp://example.com/embeddings.json".to_string());
        assert!(CorpusSource::from_settings(&settings).is_err());

        settings.url = Some("   ".to_string());
        assert!(matches!(
            CorpusSource::from_settings(&settings).unwrap(),
            CorpusSource::Path(_)
        ));
    }

    #[tokio::test]
    async fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("embeddings.json");

        let file = CorpusFile {
            model: Some("embed-english-v3.0".to_string()),
            dimensions: Some(2),
            created_at: Some(Utc::now()),
            chunks: vec![
                record("Hello Triangle", "vertex buffers", 0.0, vec![1.0, 0.0]),
                record("Shaders", "fragment shaders", 30.0, vec![0.0, 1.0]),
            ],
        };
        write_corpus(&path, &file).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let handle = load_corpus(&settings_for(&path)).await;
        let store = handle.store().expect("corpus should load");
        assert_eq!(store.len(), 2);
        assert_eq!(store.model(), Some("embed-english-v3.0"));
        assert_eq!(store.chunk(1).unwrap().title, "Shaders");
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let handle = load_corpus(&settings_for(&dir.path().join("missing.json"))).await;
        match handle {
            CorpusHandle::Unavailable { reason } => assert!(reason.contains("missing.json")),
            CorpusHandle::Ready(_) => panic!("expected unavailable corpus"),
        }
    }

    #[test]
    fn test_parse_bare_array() {
        let json = br#"[{"title": "A", "number": 1, "start": 0.0, "end": 4.5, "text": "hi", "embedding": [0.5, 0.5]}]"#;
        let store = parse_corpus(json, "inline").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.dimensions(), 2);
        assert!(store.model().is_none());
    }

    #[test]
    fn test_parse_rejects_garbage_and_declared_dimension_mismatch() {
        let err = parse_corpus(b"not json", "inline").unwrap_err();
        assert!(matches!(err, CorpusError::Parse { .. }));

        let json = br#"{"dimensions": 3, "chunks": [{"title": "A", "number": 1, "start": 0, "end": 1, "text": "hi", "embedding": [0.5, 0.5]}]}"#;
        let err = parse_corpus(json, "inline").unwrap_err();
        assert!(matches!(err, CorpusError::DimensionMismatch { expected: 3, actual: 2, .. }));
    }
}
