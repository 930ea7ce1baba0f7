use thiserror::Error;

use crate::llm::LlmError;
use crate::scrape::ScrapeError;

#[derive(Error, Debug)]
pub enum SqlChatError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model error: {0}")]
    Llm(#[from] LlmError),

    #[error("Scrape error: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("Not connected to a database; connect first")]
    NotConnected,

    #[error("IPC error: {0}")]
    Ipc(String),

    #[error("Other error: {0}")]
    Other(String),
}
