//! Cohere chat v2 implementation.

use super::Generator;
use crate::client::{api_key_from_env, create_http_client, map_reqwest_error, missing_key};
use crate::config::GenerationSettings;
use crate::error::ProviderError;
use crate::rag::{ChatMessage, Context, PromptBuilder};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const PROVIDER: &str = "cohere";

/// Cohere-based answer generator.
pub struct CohereGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    api_key: Option<String>,
    api_key_env: String,
    timeout: Duration,
    prompts: PromptBuilder,
}

impl CohereGenerator {
    /// Create a generator from settings. A missing API key is reported on the
    /// first call.
    pub fn from_settings(settings: &GenerationSettings, prompts: PromptBuilder) -> Result<Self, ProviderError> {
        Self::new(api_key_from_env(settings.api_key_env()), settings, prompts)
    }

    /// Create a generator with an explicit key. `None` fails on first use.
    pub fn new(
        api_key: Option<String>,
        settings: &GenerationSettings,
        prompts: PromptBuilder,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: create_http_client(PROVIDER, settings.timeout())?,
            endpoint: format!("{}/v2/chat", settings.base_url().trim_end_matches('/')),
            model: settings.model().to_string(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            api_key,
            api_key_env: settings.api_key_env().to_string(),
            timeout: settings.timeout(),
            prompts,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl ChatResponse {
    fn into_text(self) -> Option<String> {
        self.message
            .content
            .into_iter()
            .find_map(|block| block.text)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    }
}

#[async_trait]
impl Generator for CohereGenerator {
    #[instrument(skip(self, context, query), fields(chunks = context.len()))]
    async fn generate(&self, context: &Context, query: &str) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| missing_key(PROVIDER, &self.api_key_env))?;

        let messages = self.prompts.messages(context, query);
        let request = ChatRequest {
            model: &self.model,
            messages: &messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
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
            warn!("Cohere chat API returned status {}", status);
            return Err(ProviderError::from_status(PROVIDER, status, &body)
                .unwrap_or_else(|| ProviderError::transport(PROVIDER, format!("HTTP {}", status))));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| map_reqwest_error(PROVIDER, self.timeout, e))?;

        let answer = parsed
            .into_text()
            .ok_or_else(|| ProviderError::transport(PROVIDER, "Empty response from model"))?;
        debug!("Generated answer ({} chars)", answer.len());
        Ok(answer)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}
