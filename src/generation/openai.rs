//! OpenAI chat completions implementation.

use super::Generator;
use crate::client::{api_key_from_env, create_openai_client, map_openai_error, missing_key};
use crate::config::GenerationSettings;
use crate::error::ProviderError;
use crate::rag::{ChatMessage, Context, PromptBuilder, Role};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

const PROVIDER: &str = "openai";

/// OpenAI-based answer generator.
pub struct OpenAIGenerator {
    client: Option<async_openai::Client<async_openai::config::OpenAIConfig>>,
    api_key_env: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
    prompts: PromptBuilder,
}

impl OpenAIGenerator {
    pub fn from_settings(settings: &GenerationSettings, prompts: PromptBuilder) -> Result<Self, ProviderError> {
        Self::new(api_key_from_env(settings.api_key_env()), settings, prompts)
    }

    /// Create a generator with an explicit key. `None` fails on first use.
    pub fn new(
        api_key: Option<String>,
        settings: &GenerationSettings,
        prompts: PromptBuilder,
    ) -> Result<Self, ProviderError> {
        let client = api_key
            .map(|key| create_openai_client(&key, settings.base_url(), settings.timeout()))
            .transpose()?;

        Ok(Self {
            client,
            api_key_env: settings.api_key_env().to_string(),
            model: settings.model().to_string(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            timeout: settings.timeout(),
            prompts,
        })
    }
}

fn to_request_message(message: ChatMessage) -> Result<ChatCompletionRequestMessage, ProviderError> {
    let build_error = |e: async_openai::error::OpenAIError| ProviderError::transport(PROVIDER, e.to_string());
    let message = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content)
            .build()
            .map_err(build_error)?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content)
            .build()
            .map_err(build_error)?
            .into(),
    };
    Ok(message)
}

#[async_trait]
impl Generator for OpenAIGenerator {
    #[instrument(skip(self, context, query), fields(chunks = context.len()))]
    async fn generate(&self, context: &Context, query: &str) -> Result<String, ProviderError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| missing_key(PROVIDER, &self.api_key_env))?;

        let messages = self
            .prompts
            .messages(context, query)
            .into_iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature);
        if let Some(max_tokens) = self.max_tokens {
            builder.max_completion_tokens(max_tokens);
        }
        let request = builder
            .build()
            .map_err(|e| ProviderError::transport(PROVIDER, e.to_string()))?;

        let response = client
            .chat()
            .create(request)
            .await
            .map_err(|e| map_openai_error(self.timeout, e))?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| ProviderError::transport(PROVIDER, "Empty response from LLM"))?;

        debug!("Generated answer ({} chars)", answer.len());
        Ok(answer)
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::mock_provider;
    use axum::http::StatusCode;

    #[test]
    fn test_message_conversion() {
        let converted = to_request_message(ChatMessage::system("be helpful")).unwrap();
        assert!(matches!(converted, ChatCompletionRequestMessage::System(_)));

        let converted = to_request_message(ChatMessage::user("what is a VAO?")).unwrap();
        assert!(matches!(converted, ChatCompletionRequestMessage::User(_)));
    }

    fn mock_settings(base_url: String) -> GenerationSettings {
        GenerationSettings {
            provider: crate::config::GenerationProviderKind::OpenAI,
            base_url: format!("{}/v1", base_url),
            timeout_secs: 3,
            ..GenerationSettings::default()
        }
    }

    #[tokio::test]
    async fn test_rate_limit_is_reported_without_waiting_for_deadline() {
        let base = mock_provider(
            StatusCode::TOO_MANY_REQUESTS,
            serde_json::json!({"error": {
                "message": "Rate limit reached for requests",
                "type": "requests",
                "param": null,
                "code": "rate_limit_exceeded"
            }}),
        )
        .await;
        let generator =
            OpenAIGenerator::new(Some("sk-test".to_string()), &mock_settings(base), PromptBuilder::default()).unwrap();

        let started = std::time::Instant::now();
        let err = generator.generate(&Context::default(), "q").await.unwrap_err();
        assert!(err.is_rate_limited(), "got {:?}", err);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_invalid_key_and_success() {
        let base = mock_provider(
            StatusCode::UNAUTHORIZED,
            serde_json::json!({"error": {
                "message": "Incorrect API key provided",
                "type": "invalid_request_error",
                "param": null,
                "code": "invalid_api_key"
            }}),
        )
        .await;
        let generator =
            OpenAIGenerator::new(Some("sk-bad".to_string()), &mock_settings(base), PromptBuilder::default()).unwrap();
        let err = generator.generate(&Context::default(), "q").await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthInvalid { .. }), "got {:?}", err);

        let base = mock_provider(
            StatusCode::OK,
            serde_json::json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1700000000,
                "model": "gpt-4o-mini",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": " - **01:10** Shaders \n"},
                    "finish_reason": "stop",
                    "logprobs": null
                }]
            }),
        )
        .await;
        let generator =
            OpenAIGenerator::new(Some("sk-test".to_string()), &mock_settings(base), PromptBuilder::default()).unwrap();
        let answer = generator.generate(&Context::default(), "q").await.unwrap();
        assert_eq!(answer, "- **01:10** Shaders");
    }

    #[tokio::test]
    async fn test_missing_key_is_auth_error() {
        let settings = GenerationSettings {
            provider: crate::config::GenerationProviderKind::OpenAI,
            api_key_env: "LECTERN_TEST_UNSET_KEY".to_string(),
            ..GenerationSettings::default()
        };
        let generator = OpenAIGenerator::from_settings(&settings, PromptBuilder::default()).unwrap();
        let err = generator.generate(&Context::default(), "q").await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthInvalid { .. }));
    }
}
