pub mod config;
pub mod db;
pub mod error;
pub mod ipc;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod scrape;

pub use config::SqlChatConfig;
pub use db::{DatabaseConnector, MySqlConnector, MySqlDatabase, SqlDatabase};
pub use error::SqlChatError;
pub use llm::{ChatBackend, LlmConfig, LlmError, OpenAiChatClient, DEFAULT_MODEL};
pub use models::{ChatSession, ChatState, ConnectionSettings, ConversationLog, Turn};
pub use prompt::PromptProfile;
pub use scrape::{scrape_website, ScrapeError};
