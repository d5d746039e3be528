//! Configuration module for Lectern.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    CorpusSettings, EmbeddingProviderKind, EmbeddingSettings, GeneralSettings,
    GenerationProviderKind, GenerationSettings, PromptSettings, RankerKind, RetrievalSettings,
    ServerSettings, Settings,
};
