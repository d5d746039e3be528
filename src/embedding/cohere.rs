//! Cohere embed v3 implementation.

use super::{check_count, EmbedPurpose, Embedder};
use crate::client::{api_key_from_env, create_http_client, map_reqwest_error, missing_key};
use crate::config::EmbeddingSettings;
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const PROVIDER: &str = "cohere";

/// Cohere-based embedder.
pub struct CohereEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    timeout: Duration,
}

impl CohereEmbedder {
    /// Create an embedder from settings. A missing API key is reported on the
    /// first call, not here, so the service can start without one.
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self, ProviderError> {
        let api_key_env = settings.api_key_env().to_string();
        Self::new(
            api_key_from_env(&api_key_env),
            api_key_env,
            settings.base_url(),
            settings.model(),
            settings.timeout(),
        )
    }

    pub fn new(
        api_key: Option<String>,
        api_key_env: String,
        base_url: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: create_http_client(PROVIDER, timeout)?,
            endpoint: format!("{}/v1/embed", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
            api_key_env,
            timeout,
        })
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: &'a [String],
    input_type: &'static str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl Embedder for CohereEmbedder {
    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed(&self, texts: &[String], purpose: EmbedPurpose) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| missing_key(PROVIDER, &self.api_key_env))?;

        debug!("Generating embeddings for {} texts", texts.len());

        let request = EmbedRequest {
            model: &self.model,
            texts,
            input_type: purpose.as_input_type(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_reqwest_error(PROVIDER, self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Cohere embed API returned status {}", status);
            return Err(ProviderError::from_status(PROVIDER, status, &body)
                .unwrap_or_else(|| ProviderError::transport(PROVIDER, format!("HTTP {}", status))));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| map_reqwest_error(PROVIDER, self.timeout, e))?;

        check_count(PROVIDER, texts.len(), &parsed.embeddings)?;
        debug!("Generated {} embeddings", parsed.embeddings.len());
        Ok(parsed.embeddings)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }
}
