use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::db::SqlDatabase;
use crate::models::{ConnectionSettings, ConversationLog};
use crate::prompt::PromptProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatState {
    Idle,
    AwaitingModelResponse,
}

/// Everything one user's chat owns. Created on session start and dropped on
/// session end; never shared between sessions.
pub struct ChatSession {
    pub id: Uuid,
    pub profile: PromptProfile,
    pub started_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    state: ChatState,
    log: ConversationLog,
    settings: Option<ConnectionSettings>,
    database: Option<Arc<dyn SqlDatabase>>,
    scraped: Option<Vec<String>>,
}

/// Serializable view of a session for transports.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub profile: PromptProfile,
    pub state: ChatState,
    pub started_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub connection: Option<String>,
    pub turns: usize,
    pub scraped_paragraphs: Option<usize>,
}

impl ChatSession {
    pub fn new(profile: PromptProfile) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            profile,
            started_at: now,
            last_active_at: now,
            state: ChatState::Idle,
            log: ConversationLog::new(),
            settings: None,
            database: None,
            scraped: None,
        }
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn settings(&self) -> Option<&ConnectionSettings> {
        self.settings.as_ref()
    }

    pub fn database(&self) -> Option<Arc<dyn SqlDatabase>> {
        self.database.clone()
    }

    pub fn scraped(&self) -> Option<&[String]> {
        self.scraped.as_deref()
    }

    pub fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }

    /// Time since the last action on this session.
    pub fn idle_for(&self) -> std::time::Duration {
        (Utc::now() - self.last_active_at)
            .to_std()
            .unwrap_or_default()
    }

    /// Replace the handle after a successful connect. Previously scraped
    /// content is kept until a new scrape replaces it.
    pub fn attach(&mut self, settings: ConnectionSettings, database: Arc<dyn SqlDatabase>) {
        self.settings = Some(settings);
        self.database = Some(database);
        self.touch();
    }

    pub fn set_scraped(&mut self, scraped: Option<Vec<String>>) {
        self.scraped = scraped;
        self.touch();
    }

    /// Record a user question. Blank input is ignored and returns `false`.
    pub fn accept_question(&mut self, question: &str) -> bool {
        if question.trim().is_empty() {
            return false;
        }
        self.log.push_human(question);
        self.state = ChatState::AwaitingModelResponse;
        self.touch();
        true
    }

    pub fn complete_turn(&mut self, answer: impl Into<String>) {
        self.log.push_assistant(answer);
        self.state = ChatState::Idle;
        self.touch();
    }

    /// Return to idle after a failed turn. The question stays in the log.
    pub fn abort_turn(&mut self) {
        self.state = ChatState::Idle;
        self.touch();
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            profile: self.profile,
            state: self.state,
            started_at: self.started_at,
            last_active_at: self.last_active_at,
            connection: self.settings.as_ref().map(ConnectionSettings::redacted),
            turns: self.log.len(),
            scraped_paragraphs: self.scraped.as_ref().map(Vec::len),
        }
    }
}
