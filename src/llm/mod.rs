pub mod client;
pub mod conversation;

pub use client::OpenAiClient;
pub use conversation::{advance_conversation, ConversationOutcome};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A chat-completion backend: ordered turns in, one reply out.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, turns: &[ConversationTurn]) -> Result<String, AppError>;
}
