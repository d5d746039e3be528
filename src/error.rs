//! Error types for Lectern.

use std::time::Duration;
use thiserror::Error;

/// Library-level error type for Lectern operations.
#[derive(Error, Debug)]
pub enum LecternError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Indexing failed: {0}")]
    Index(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Failure reported by an embedding or generation provider.
///
/// Callers treat every variant as fatal for the call that produced it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// HTTP 429 / 402: request quota exhausted or billing required.
    #[error("{provider} rate limit reached or billing required")]
    RateLimited { provider: String },

    /// Credentials missing or rejected.
    #[error("{provider} credentials are missing or invalid: {message}")]
    AuthInvalid { provider: String, message: String },

    /// Connection failures, unexpected status codes and unreadable bodies.
    #[error("{provider} request failed: {message}")]
    Transport { provider: String, message: String },

    /// The call exceeded its deadline.
    #[error("{provider} request timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },
}

impl ProviderError {
    pub fn transport(provider: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn auth(provider: &str, message: impl Into<String>) -> Self {
        Self::AuthInvalid {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn rate_limited(provider: &str) -> Self {
        Self::RateLimited {
            provider: provider.to_string(),
        }
    }

    /// Whether this failure should be reported as a quota/billing problem.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Map an HTTP status code from a provider to an error.
    ///
    /// Returns `None` for success codes.
    pub fn from_status(provider: &str, status: reqwest::StatusCode, body: &str) -> Option<Self> {
        use reqwest::StatusCode;

        if status.is_success() {
            return None;
        }
        let err = match status {
            StatusCode::TOO_MANY_REQUESTS | StatusCode::PAYMENT_REQUIRED => {
                Self::rate_limited(provider)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::auth(provider, body_excerpt(body)),
            _ => Self::transport(provider, format!("HTTP {}: {}", status, body_excerpt(body))),
        };
        Some(err)
    }
}

fn body_excerpt(body: &str) -> String {
    const MAX: usize = 200;
    let body = body.trim();
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// Failure to load or validate a corpus.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorpusError {
    #[error("Failed to read corpus from {source_name}: {message}")]
    Read { source_name: String, message: String },

    #[error("Corpus at {source_name} is not valid JSON: {message}")]
    Parse { source_name: String, message: String },

    #[error("Corpus contains no chunks")]
    Empty,

    #[error("Chunk {index} is invalid: {reason}")]
    InvalidChunk { index: usize, reason: String },

    #[error("Chunk {index} has {actual}-dimensional embedding, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

/// Result type alias for Lectern operations.
pub type Result<T> = std::result::Result<T, LecternError>;
