use serde::{Deserialize, Serialize};

/// First assistant turn of every session.
pub const GREETING: &str = "Hello! I'm a SQL assistant. Ask me anything about your database.";

/// A single chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "content", rename_all = "snake_case")]
pub enum Turn {
    Assistant(String),
    Human(String),
}

impl Turn {
    /// Label shown next to the turn in a transcript.
    pub fn speaker(&self) -> &'static str {
        match self {
            Turn::Assistant(_) => "AI",
            Turn::Human(_) => "Human",
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Turn::Assistant(text) | Turn::Human(text) => text,
        }
    }
}

/// Append-only, chronological record of a session's turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::new()
    }
}

// Never empty: the greeting is always the first turn.
#[allow(clippy::len_without_is_empty)]
impl ConversationLog {
    pub fn new() -> Self {
        Self {
            turns: vec![Turn::Assistant(GREETING.to_string())],
        }
    }

    pub fn push_human(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::Human(content.into()));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::Assistant(content.into()));
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// History as substituted into prompts: one `Speaker: text` line per turn.
    pub fn render_history(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("{}: {}", t.speaker(), t.content()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
