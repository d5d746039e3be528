//! Answer generation from retrieved context.

mod cohere;
mod extractive;
mod openai;

pub use cohere::CohereGenerator;
pub use extractive::ExtractiveGenerator;
pub use openai::OpenAIGenerator;

use crate::config::{GenerationProviderKind, GenerationSettings, Prompts};
use crate::error::ProviderError;
use crate::rag::{Context, PromptBuilder};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for answer generation.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Compose an answer to `query` from the retrieved `context`.
    async fn generate(&self, context: &Context, query: &str) -> Result<String, ProviderError>;

    /// Provider name, used in logs and errors.
    fn name(&self) -> &'static str;
}

/// Build the generator selected in settings.
pub fn create_generator(
    settings: &GenerationSettings,
    prompts: Prompts,
) -> Result<Arc<dyn Generator>, ProviderError> {
    let builder = PromptBuilder::new(prompts);
    let generator: Arc<dyn Generator> = match settings.provider {
        GenerationProviderKind::Cohere => Arc::new(CohereGenerator::from_settings(settings, builder)?),
        GenerationProviderKind::OpenAI => Arc::new(OpenAIGenerator::from_settings(settings, builder)?),
        GenerationProviderKind::Extractive => Arc::new(ExtractiveGenerator),
    };
    Ok(generator)
}
