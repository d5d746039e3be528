//! Message construction for the generator.

use super::Context;
use crate::config::Prompts;
use serde::Serialize;
use std::collections::HashMap;

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One turn of a chat request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Renders the system and user turns from prompt templates.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    prompts: Prompts,
}

impl PromptBuilder {
    pub fn new(prompts: Prompts) -> Self {
        Self { prompts }
    }

    /// System turn followed by a user turn carrying the context records and query.
    pub fn messages(&self, context: &Context, query: &str) -> Vec<ChatMessage> {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());
        vars.insert("context".to_string(), context.to_records_json());

        vec![
            ChatMessage::system(self.prompts.render_with_custom(&self.prompts.rag.system, &vars)),
            ChatMessage::user(self.prompts.render_with_custom(&self.prompts.rag.user, &vars)),
        ]
    }
}
