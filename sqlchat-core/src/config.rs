use config::{Config, ConfigError, File};
use serde::Deserialize;

use crate::prompt::PromptProfile;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SqlChatConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub socket_path: String,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: "/tmp/sqlchat.sock".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// Sessions idle longer than this are dropped. 0 keeps them until deleted.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

fn default_session_idle_secs() -> u64 {
    1800
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8501,
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

/// `[llm]` section. The API key is never read from the file, only from
/// `OPENAI_API_KEY`.
#[derive(Debug, Deserialize, Clone)]
pub struct LlmSettings {
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: crate::llm::DEFAULT_MODEL.to_string(),
            base_url: crate::llm::DEFAULT_BASE_URL.to_string(),
            temperature: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    /// Example rows appended to each table in the schema description.
    pub sample_rows: u32,
    /// How long a connect may wait for the server before failing.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 1,
            sample_rows: 3,
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PromptConfig {
    #[serde(default)]
    pub profile: PromptProfile,
}

impl SqlChatConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .build()?;
        s.try_deserialize()
    }
}
