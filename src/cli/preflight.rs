//! Pre-flight checks before provider calls.
//!
//! Services start without API keys so they can report failures per request;
//! the one-shot commands check up front instead of failing after the corpus
//! has loaded.

use crate::client::api_key_from_env;
use crate::config::{GenerationProviderKind, RankerKind, Settings};
use crate::error::{LecternError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Indexing embeds documents.
    Index,
    /// Answering embeds the query and generates.
    Ask,
    /// Searching embeds the query.
    Search,
}

/// Run pre-flight checks for the given operation.
pub fn check(settings: &Settings, operation: Operation) -> Result<()> {
    check_with(settings, operation, api_key_from_env)
}

fn check_with(settings: &Settings, operation: Operation, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
    let needs_embedding = match operation {
        Operation::Index => true,
        Operation::Ask | Operation::Search => settings.retrieval.ranker == RankerKind::Cosine,
    };
    if needs_embedding {
        require_key(settings.embedding.api_key_env(), &lookup)?;
    }

    if matches!(operation, Operation::Ask) && settings.generation.provider != GenerationProviderKind::Extractive {
        require_key(settings.generation.api_key_env(), &lookup)?;
    }
    Ok(())
}

fn require_key(var: &str, lookup: &impl Fn(&str) -> Option<String>) -> Result<()> {
    match lookup(var) {
        Some(_) => Ok(()),
        None => Err(LecternError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            var, var
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_missing_embedding_key() {
        let settings = Settings::default();
        let err = check_with(&settings, Operation::Search, none).unwrap_err();
        assert!(err.to_string().contains("COHERE_API_KEY"));
    }

    #[test]
    fn test_offline_setup_needs_no_keys() {
        let mut settings = Settings::default();
        settings.retrieval.ranker = RankerKind::Lexical;
        settings.generation.provider = GenerationProviderKind::Extractive;
        assert!(check_with(&settings, Operation::Ask, none).is_ok());
        assert!(check_with(&settings, Operation::Index, none).is_err());
    }

    #[test]
    fn test_keys_present() {
        let settings = Settings::default();
        let lookup = |_: &str| Some("key".to_string());
        assert!(check_with(&settings, Operation::Ask, lookup).is_ok());
    }
}
