//! In-memory stand-ins for the model and the database.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlchat_core::{
    ChatBackend, ConnectionSettings, DatabaseConnector, LlmError, SqlChatError, SqlDatabase,
};

pub const SCHEMA: &str = "CREATE TABLE `suicides_data` (\n  `State` varchar(64),\n  `Year` int,\n  `Type` varchar(64),\n  `Gender` varchar(16)\n)";

pub const STATE_QUERY: &str =
    "SELECT State, COUNT(*) AS total_suicides FROM suicides_data GROUP BY State;";

/// Replies in order and records every prompt it was sent.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(LlmError::MissingCompletion)
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Fixed schema; known queries return canned results, anything else is a
/// syntax error.
pub struct FakeDb {
    schema: String,
    results: HashMap<String, String>,
    executed: Mutex<Vec<String>>,
}

impl FakeDb {
    pub fn new(schema: &str) -> Self {
        Self {
            schema: schema.to_string(),
            results: HashMap::new(),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_result(mut self, sql: &str, result: &str) -> Self {
        self.results.insert(sql.to_string(), result.to_string());
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl SqlDatabase for FakeDb {
    async fn table_info(&self) -> Result<String, SqlChatError> {
        Ok(self.schema.clone())
    }

    async fn run(&self, sql: &str) -> Result<String, SqlChatError> {
        self.executed.lock().unwrap().push(sql.to_string());
        self.results.get(sql).cloned().ok_or_else(|| {
            SqlChatError::Other(format!(
                "1064 (42000): You have an error in your SQL syntax near '{}'",
                sql
            ))
        })
    }

    async fn server_version(&self) -> Result<String, SqlChatError> {
        Ok("8.0.36-fake".to_string())
    }
}

/// Hands out the same `FakeDb`, or refuses every connection.
pub struct FakeConnector {
    db: Option<Arc<FakeDb>>,
}

impl FakeConnector {
    pub fn serving(db: Arc<FakeDb>) -> Self {
        Self { db: Some(db) }
    }

    pub fn unreachable() -> Self {
        Self { db: None }
    }
}

#[async_trait]
impl DatabaseConnector for FakeConnector {
    async fn connect(
        &self,
        _settings: &ConnectionSettings,
    ) -> Result<Arc<dyn SqlDatabase>, SqlChatError> {
        match &self.db {
            Some(db) => Ok(db.clone() as Arc<dyn SqlDatabase>),
            None => Err(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Connection refused (os error 111)",
            ))
            .into()),
        }
    }
}
