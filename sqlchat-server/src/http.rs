//! sqlchat HTTP API
//!
//! Axum server exposing chat sessions over HTTP. Each session is an isolated
//! `ChatSession` behind its own mutex, so requests on one session are handled
//! one at a time while different sessions proceed independently.
//!
//! As in the IPC server, handlers are thin wrappers over inner functions that
//! translate into a `ChatRequest` and go through the shared router.
//!
//! Endpoints:
//! - GET    /health                liveness, model name, open sessions
//! - GET    /version               server version info
//! - POST   /sessions              start a session (greeting only)
//! - GET    /sessions/:id          session summary
//! - DELETE /sessions/:id          end a session
//! - POST   /sessions/:id/connect  open the database (and scrape the website)
//! - POST   /sessions/:id/ask      ask a question
//! - GET    /sessions/:id/history  full transcript

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use sqlchat_core::ipc::{ChatRequest, ChatResponse};
use sqlchat_core::{ChatSession, ConnectionSettings};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex, RwLock};
use uuid::Uuid;

use crate::context::AppContext;

/// How often the reaper sweeps for idle sessions.
const REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Live sessions keyed by id. Sessions idle for longer than `idle_timeout`
/// are dropped, together with their database pool.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<ChatSession>>>>,
    idle_timeout: Option<Duration>,
}

impl SessionStore {
    /// `None` keeps sessions until they are deleted.
    pub fn new(idle_timeout: Option<Duration>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    pub async fn create(&self, session: ChatSession) -> Uuid {
        self.evict_idle().await;
        let id = session.id;
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<ChatSession>>> {
        self.evict_idle().await;
        self.sessions.read().await.get(&id).cloned()
    }

    /// Drop every idle session and return how many went. A session whose lock
    /// is held is mid-request and never idle.
    pub async fn evict_idle(&self) -> usize {
        let timeout = match self.idle_timeout {
            Some(t) => t,
            None => return 0,
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| match session.try_lock() {
            Ok(s) if s.idle_for() >= timeout => {
                tracing::info!(session = %id, idle_secs = s.idle_for().as_secs(), "Evicting idle HTTP session");
                false
            }
            _ => true,
        });
        before - sessions.len()
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Shared state for all HTTP handlers
pub struct HttpState {
    pub ctx: Arc<AppContext>,
    pub sessions: SessionStore,
}

impl HttpState {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let idle_timeout = match ctx.config.http.session_idle_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self {
            ctx,
            sessions: SessionStore::new(idle_timeout),
        }
    }
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/sessions", post(create_session_handler))
        .route(
            "/sessions/:id",
            get(session_handler).delete(delete_session_handler),
        )
        .route("/sessions/:id/connect", post(connect_handler))
        .route("/sessions/:id/ask", post(ask_handler))
        .route("/sessions/:id/history", get(history_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    ctx: Arc<AppContext>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", ctx.config.http.host, ctx.config.http.port);
    let state = Arc::new(HttpState::new(ctx));

    let reaper_state = state.clone();
    let mut reaper_shutdown = shutdown.resubscribe();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(REAP_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    reaper_state.sessions.evict_idle().await;
                }
                _ = reaper_shutdown.recv() => break,
            }
        }
    });

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("sqlchat HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: Option<String>,
}

// ============================================================================
// Inner (directly testable) functions
// ============================================================================

pub async fn health_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    (
        StatusCode::OK,
        serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "model": state.ctx.llm.model(),
            "profile": state.ctx.config.prompt.profile,
            "sessions": state.sessions.len().await,
        }),
    )
}

pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "sqlchat/1",
    })
}

/// New session holding only the greeting, plus the form defaults for the
/// configured profile.
pub async fn create_session_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    let profile = state.ctx.config.prompt.profile;
    let session = ChatSession::new(profile);
    let history = serde_json::json!(session.log());
    let id = state.sessions.create(session).await;

    tracing::info!(session = %id, "HTTP session started");

    let mut defaults = ConnectionSettings::defaults_for(profile);
    if profile.scrapes_website() {
        defaults.website_url = Some(String::new());
    }

    (
        StatusCode::CREATED,
        serde_json::json!({
            "id": id,
            "profile": profile,
            "history": history,
            "defaults": defaults,
        }),
    )
}

pub async fn session_inner(state: &HttpState, id: Uuid) -> (StatusCode, serde_json::Value) {
    match state.sessions.get(id).await {
        Some(session) => {
            let summary = session.lock().await.summary();
            (StatusCode::OK, serde_json::json!(summary))
        }
        None => not_found(id),
    }
}

pub async fn delete_session_inner(state: &HttpState, id: Uuid) -> (StatusCode, serde_json::Value) {
    if state.sessions.remove(id).await {
        tracing::info!(session = %id, "HTTP session ended");
        (StatusCode::OK, serde_json::json!({ "deleted": true, "id": id }))
    } else {
        not_found(id)
    }
}

/// Dispatch a request against one session through the shared router.
pub async fn session_request_inner(
    state: &HttpState,
    id: Uuid,
    request: ChatRequest,
) -> (StatusCode, serde_json::Value) {
    let session = match state.sessions.get(id).await {
        Some(s) => s,
        None => return not_found(id),
    };

    let mut session = session.lock().await;
    let response = crate::router::handle_request(request, &mut session, &state.ctx).await;

    match response_to_http(response) {
        Ok(data) => (StatusCode::OK, data),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({
                "error": e,
                "status": "error",
            }),
        ),
    }
}

// ============================================================================
// Axum handler wrappers, delegating to the inner functions
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn create_session_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = create_session_inner(&state).await;
    (status, Json(body))
}

pub async fn session_handler(
    State(state): State<Arc<HttpState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let (status, body) = session_inner(&state, id).await;
    (status, Json(body))
}

pub async fn delete_session_handler(
    State(state): State<Arc<HttpState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let (status, body) = delete_session_inner(&state, id).await;
    (status, Json(body))
}

pub async fn connect_handler(
    State(state): State<Arc<HttpState>>,
    Path(id): Path<Uuid>,
    Json(settings): Json<ConnectionSettings>,
) -> impl IntoResponse {
    let (status, body) =
        session_request_inner(&state, id, ChatRequest::Connect { settings }).await;
    (status, Json(body))
}

pub async fn ask_handler(
    State(state): State<Arc<HttpState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AskRequest>,
) -> impl IntoResponse {
    let question = req.question.unwrap_or_default();
    let (status, body) = session_request_inner(&state, id, ChatRequest::Ask { question }).await;
    (status, Json(body))
}

pub async fn history_handler(
    State(state): State<Arc<HttpState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let (status, body) = session_request_inner(&state, id, ChatRequest::History).await;
    (status, Json(body))
}

// ============================================================================
// Helpers
// ============================================================================

/// Convert an IPC `ChatResponse` into an HTTP body value, or an error string.
pub fn response_to_http(response: ChatResponse) -> std::result::Result<serde_json::Value, String> {
    if response.is_ok() {
        Ok(response.data.unwrap_or(serde_json::json!({})))
    } else {
        Err(response.error.unwrap_or_else(|| "unknown error".to_string()))
    }
}

fn not_found(id: Uuid) -> (StatusCode, serde_json::Value) {
    (
        StatusCode::NOT_FOUND,
        serde_json::json!({
            "error": format!("session {} not found", id),
            "status": "error",
        }),
    )
}
