//! OpenAI embeddings implementation.

use super::{check_count, EmbedPurpose, Embedder};
use crate::client::{api_key_from_env, create_openai_client, map_openai_error, missing_key};
use crate::config::EmbeddingSettings;
use crate::error::ProviderError;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

const PROVIDER: &str = "openai";

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: Option<async_openai::Client<async_openai::config::OpenAIConfig>>,
    api_key_env: String,
    model: String,
    dimensions: u32,
    timeout: Duration,
}

impl OpenAIEmbedder {
    /// Create an embedder from settings. Without an API key the embedder is
    /// still built and fails on first use.
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self, ProviderError> {
        let api_key_env = settings.api_key_env().to_string();
        let client = api_key_from_env(&api_key_env)
            .map(|key| create_openai_client(&key, settings.base_url(), settings.timeout()))
            .transpose()?;

        Ok(Self {
            client,
            api_key_env,
            model: settings.model().to_string(),
            dimensions: settings.dimensions,
            timeout: settings.timeout(),
        })
    }

    /// Embedding dimensions requested from the API.
    pub fn dimensions(&self) -> u32 {
        self.dimensions
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    /// OpenAI embeds documents and queries the same way, so `purpose` is unused.
    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed(&self, texts: &[String], _purpose: EmbedPurpose) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| missing_key(PROVIDER, &self.api_key_env))?;

        debug!("Generating embeddings for {} texts", texts.len());

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(texts.to_vec()))
            .dimensions(self.dimensions)
            .build()
            .map_err(|e| ProviderError::transport(PROVIDER, format!("Failed to build request: {}", e)))?;

        let response = client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| map_openai_error(self.timeout, e))?;

        // Sort by index to ensure correct order
        let mut data = response.data;
        data.sort_by_key(|e| e.index);
        let embeddings: Vec<Vec<f32>> = data.into_iter().map(|e| e.embedding).collect();

        check_count(PROVIDER, texts.len(), &embeddings)?;
        debug!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingProviderKind;

    fn settings(dimensions: u32) -> EmbeddingSettings {
        EmbeddingSettings {
            provider: EmbeddingProviderKind::OpenAI,
            model: "text-embedding-3-large".to_string(),
            dimensions,
            api_key_env: "LECTERN_TEST_UNSET_KEY".to_string(),
            ..EmbeddingSettings::default()
        }
    }

    #[test]
    fn test_embedder_creation() {
        let embedder = OpenAIEmbedder::from_settings(&settings(3072)).unwrap();
        assert_eq!(embedder.dimensions(), 3072);
        assert_eq!(embedder.model(), "text-embedding-3-large");
    }

    #[tokio::test]
    async fn test_missing_key_is_auth_error() {
        let embedder = OpenAIEmbedder::from_settings(&settings(1536)).unwrap();
        let err = embedder.embed_query("what is a VBO?").await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthInvalid { .. }));
    }
}
