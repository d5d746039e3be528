//! Context assembly and prompt construction for answer generation.

pub mod context;
mod prompt;

pub use context::{truncate_chars, Context, ContextAssembler, ContextEntry, DEFAULT_MAX_TEXT_CHARS};
pub use prompt::{ChatMessage, PromptBuilder, Role};
