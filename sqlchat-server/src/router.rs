use crate::context::AppContext;
use crate::subsystems::{connect, turn};
use sqlchat_core::ipc::{ChatRequest, ChatResponse};
use sqlchat_core::ChatSession;

/// Apply one UI action to a session. Every failure is reported in the
/// response; nothing is retried.
pub async fn handle_request(
    request: ChatRequest,
    session: &mut ChatSession,
    ctx: &AppContext,
) -> ChatResponse {
    match request {
        ChatRequest::Ping => ChatResponse::pong(),
        ChatRequest::Health => {
            let database = match session.database() {
                Some(db) => match db.server_version().await {
                    Ok(v) => serde_json::json!({ "connected": true, "version": v }),
                    Err(e) => {
                        return ChatResponse::err(format!("DB Health Check failed: {}", e))
                    }
                },
                None => serde_json::json!({ "connected": false }),
            };
            ChatResponse::ok(serde_json::json!({
                "status": "healthy",
                "model": ctx.llm.model(),
                "database": database,
            }))
        }
        ChatRequest::Connect { settings } => {
            match connect::connect_session(ctx, session, settings).await {
                Ok(report) => ChatResponse::ok(serde_json::json!(report)),
                Err(e) => ChatResponse::err(e.to_string()),
            }
        }
        ChatRequest::Ask { question } => match turn::ask(ctx, session, &question).await {
            Ok(Some(output)) => ChatResponse::ok(serde_json::json!({
                "answer": output.answer,
                "query": output.query,
                "turns": session.log().len(),
            })),
            Ok(None) => ChatResponse::ok(serde_json::json!({
                "ignored": true,
                "turns": session.log().len(),
            })),
            Err(e) => ChatResponse::err(e.to_string()),
        },
        ChatRequest::History => ChatResponse::ok(serde_json::json!({
            "state": session.state(),
            "history": session.log(),
        })),
    }
}
