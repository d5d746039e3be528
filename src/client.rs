//! HTTP client construction and call deadlines shared by the providers.

use crate::error::ProviderError;
use async_openai::{config::OpenAIConfig, error::OpenAIError, Client};
use std::future::Future;
use std::time::Duration;

/// Build a `reqwest` client whose requests give up after `timeout`.
pub fn create_http_client(provider: &str, timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::transport(provider, format!("failed to build HTTP client: {}", e)))
}

/// Create an OpenAI client with the given key, base URL and timeout.
///
/// The client's own retry loop is disabled: a 429 is returned at once so it
/// can be reported as a rate limit instead of running into the deadline.
pub fn create_openai_client(
    api_key: &str,
    base_url: &str,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>, ProviderError> {
    let http_client = create_http_client("openai", timeout)?;
    let config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(base_url.trim_end_matches('/'));
    let no_retry = backoff::ExponentialBackoff {
        max_elapsed_time: Some(Duration::ZERO),
        ..Default::default()
    };
    Ok(Client::with_config(config)
        .with_http_client(http_client)
        .with_backoff(no_retry))
}

/// Read an API key from the environment, treating blank values as unset.
pub fn api_key_from_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

/// Error for a provider whose key variable is unset.
pub fn missing_key(provider: &str, var: &str) -> ProviderError {
    ProviderError::auth(provider, format!("{} is not set", var))
}

/// Run a provider call under a deadline. An elapsed deadline is reported as
/// [`ProviderError::Timeout`]; the call's future is dropped, cancelling it.
pub async fn with_deadline<T, F>(provider: &str, timeout: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout {
            provider: provider.to_string(),
            timeout,
        }),
    }
}

/// Map a `reqwest` failure, keeping timeouts distinguishable.
pub fn map_reqwest_error(provider: &str, timeout: Duration, err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout {
            provider: provider.to_string(),
            timeout,
        }
    } else {
        ProviderError::transport(provider, err.to_string())
    }
}

/// Map an `async-openai` failure onto the provider error kinds.
pub fn map_openai_error(timeout: Duration, err: OpenAIError) -> ProviderError {
    const PROVIDER: &str = "openai";

    match err {
        OpenAIError::ApiError(api) => {
            let kind = api.r#type.as_deref().unwrap_or_default();
            let message = api.message.to_lowercase();
            if matches!(kind, "insufficient_quota" | "requests" | "tokens")
                || message.contains("rate limit")
                || message.contains("quota")
            {
                ProviderError::rate_limited(PROVIDER)
            } else if message.contains("api key") || kind == "authentication_error" {
                ProviderError::auth(PROVIDER, api.message)
            } else {
                ProviderError::transport(PROVIDER, api.message)
            }
        }
        OpenAIError::Reqwest(e) => map_reqwest_error(PROVIDER, timeout, e),
        other => ProviderError::transport(PROVIDER, other.to_string()),
    }
}
