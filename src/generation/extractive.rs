//! Offline generator that answers by listing the retrieved passages.

use super::Generator;
use crate::error::ProviderError;
use crate::rag::{truncate_chars, Context};
use async_trait::async_trait;

const EXCERPT_CHARS: usize = 160;

/// Formats the context into a point list with bold timestamps. Needs no
/// network access, which makes it useful for demos and for checking retrieval.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractiveGenerator;

#[async_trait]
impl Generator for ExtractiveGenerator {
    async fn generate(&self, context: &Context, query: &str) -> Result<String, ProviderError> {
        if context.is_empty() {
            return Ok(format!(
                "I couldn't find anything in the course videos about \"{}\".",
                query.trim()
            ));
        }

        let mut answer = format!("Here is where the course covers \"{}\":\n", query.trim());
        for entry in context.entries() {
            let excerpt = truncate_chars(entry.text.trim(), EXCERPT_CHARS);
            let ellipsis = if excerpt.len() < entry.text.trim().len() { "..." } else { "" };
            answer.push_str(&format!(
                "\n- Video {}: {} at **{}**: {}{}",
                entry.number,
                entry.title,
                entry.format_timestamp(),
                excerpt,
                ellipsis
            ));
        }
        Ok(answer)
    }

    fn name(&self) -> &'static str {
        "extractive"
    }
}
