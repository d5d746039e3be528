//! Embedding generation for indexing and query-time retrieval.

mod cohere;
mod openai;

pub use cohere::CohereEmbedder;
pub use openai::OpenAIEmbedder;

use crate::config::{EmbeddingProviderKind, EmbeddingSettings};
use crate::error::ProviderError;
use async_trait::async_trait;
use std::sync::Arc;

/// What the embedded text will be used for. Some providers embed documents
/// and queries differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedPurpose {
    /// Corpus chunks, at indexing time.
    SearchDocument,
    /// A user query, at serving time.
    SearchQuery,
}

impl EmbedPurpose {
    /// Cohere `input_type` tag.
    pub fn as_input_type(&self) -> &'static str {
        match self {
            EmbedPurpose::SearchDocument => "search_document",
            EmbedPurpose::SearchQuery => "search_query",
        }
    }
}

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts. Returns one vector per input, in input order.
    async fn embed(&self, texts: &[String], purpose: EmbedPurpose) -> Result<Vec<Vec<f32>>, ProviderError>;

    /// Embed a single query string.
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, ProviderError> {
        let vectors = self.embed(&[query.to_string()], EmbedPurpose::SearchQuery).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::transport(self.name(), "empty embedding response"))
    }

    /// Provider name, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Model identifier.
    fn model(&self) -> &str;
}

/// Build the embedder selected in settings.
pub fn create_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>, ProviderError> {
    let embedder: Arc<dyn Embedder> = match settings.provider {
        EmbeddingProviderKind::Cohere => Arc::new(CohereEmbedder::from_settings(settings)?),
        EmbeddingProviderKind::OpenAI => Arc::new(OpenAIEmbedder::from_settings(settings)?),
    };
    Ok(embedder)
}

/// Check that a provider returned exactly one vector per input.
pub(crate) fn check_count(provider: &str, expected: usize, vectors: &[Vec<f32>]) -> Result<(), ProviderError> {
    if vectors.len() != expected {
        return Err(ProviderError::transport(
            provider,
            format!("returned {} embeddings for {} inputs", vectors.len(), expected),
        ));
    }
    Ok(())
}
