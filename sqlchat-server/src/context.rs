use std::sync::Arc;

use reqwest::Client;
use sqlchat_core::{
    ChatBackend, DatabaseConnector, LlmConfig, MySqlConnector, OpenAiChatClient, SqlChatConfig,
    SqlChatError,
};

/// Process-wide collaborators shared by every session.
#[derive(Clone)]
pub struct AppContext {
    pub config: SqlChatConfig,
    pub llm: Arc<dyn ChatBackend>,
    pub connector: Arc<dyn DatabaseConnector>,
    pub http_client: Client,
}

impl AppContext {
    pub fn new(
        config: SqlChatConfig,
        llm: Arc<dyn ChatBackend>,
        connector: Arc<dyn DatabaseConnector>,
    ) -> Self {
        Self {
            config,
            llm,
            connector,
            http_client: Client::new(),
        }
    }

    /// Build the production context: OpenAI chat client (key from
    /// `OPENAI_API_KEY`) and MySQL connector.
    pub fn from_config(config: SqlChatConfig) -> Result<Self, SqlChatError> {
        let llm_config = LlmConfig::new(
            None,
            config.llm.model.clone(),
            config.llm.temperature,
        );
        let llm = OpenAiChatClient::with_base_url(llm_config, config.llm.base_url.clone())?;
        let connector = MySqlConnector::new(config.database.clone());

        Ok(Self::new(config, Arc::new(llm), Arc::new(connector)))
    }
}
