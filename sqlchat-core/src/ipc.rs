use serde::{Deserialize, Serialize};

use crate::models::ConnectionSettings;

/// One UI action against a session.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ChatRequest {
    Ping,
    Health,
    Connect {
        settings: ConnectionSettings,
    },
    Ask {
        question: String,
    },
    History,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChatResponse {
    pub status: String,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub version: String,
}

impl ChatResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(msg.into()),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(serde_json::json!({"pong": true}))
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_tagged_by_action() {
        let req: ChatRequest =
            serde_json::from_value(serde_json::json!({"action": "ask", "question": "hi"})).unwrap();
        assert!(matches!(req, ChatRequest::Ask { question } if question == "hi"));
    }

    #[test]
    fn test_connect_request_website_optional() {
        let req: ChatRequest = serde_json::from_value(serde_json::json!({
            "action": "connect",
            "settings": {
                "host": "localhost", "port": "3306", "user": "root",
                "password": "admin", "database": "fda"
            }
        }))
        .unwrap();
        match req {
            ChatRequest::Connect { settings } => assert!(settings.website_url.is_none()),
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn test_err_response_shape() {
        let resp = ChatResponse::err("boom");
        assert!(!resp.is_ok());
        assert_eq!(resp.error.as_deref(), Some("boom"));
        assert!(resp.data.is_none());
    }
}
