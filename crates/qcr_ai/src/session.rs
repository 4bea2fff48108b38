use serde::{Deserialize, Serialize};

use crate::answer::SourcePreview;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub sources: Vec<SourcePreview>,
    /// RFC3339 timestamp.
    pub at: String,
}

/// Append-only transcript for one interactive session. Never sent back to the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatSession {
    turns: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ChatTurn {
            role: Role::User,
            content: content.into(),
            sources: Vec::new(),
            at: crate::now_rfc3339(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>, sources: Vec<SourcePreview>) {
        self.turns.push(ChatTurn {
            role: Role::Assistant,
            content: content.into(),
            sources,
            at: crate::now_rfc3339(),
        });
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
