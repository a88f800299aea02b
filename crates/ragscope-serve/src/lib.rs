use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use time::UtcOffset;
use tower_http::cors::CorsLayer;

use ragscope_core::{slice, EventRange, LogEvent, Partition, SessionSummary, Transcript, Turn};

pub mod chat;

pub use chat::{Answerer, ChatReply, ChatService, NoContextAnswerer, SessionManager};

// ── Config ──

pub struct ServeConfig {
    pub bind: String,
    pub port: u16,
    pub logs_dir: PathBuf,
    pub utc_offset: UtcOffset,
}

// ── App State ──

struct AppState {
    logs_dir: PathBuf,
    chat: ChatService,
}

impl AppState {
    fn session_log(&self, session_id: &str) -> anyhow::Result<Vec<LogEvent>> {
        let events = ragscope_store::read_all_events(&self.logs_dir)?;
        Ok(ragscope_store::session_events(&events, session_id))
    }
}

// ── Error Handling ──

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

// ── Entrypoint ──

pub async fn serve(config: ServeConfig) -> anyhow::Result<()> {
    let app = router(&config.logs_dir, config.utc_offset);

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, logs_dir = %config.logs_dir.display(), "listening");
    eprintln!("ragscope HTTP server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router with the bundled answerer (no document index).
pub fn router(logs_dir: &Path, offset: UtcOffset) -> Router {
    let chat = ChatService::new(logs_dir, offset, Box::new(NoContextAnswerer));
    router_with(logs_dir, chat)
}

/// Build the router around a caller-supplied chat pipeline.
pub fn router_with(logs_dir: &Path, chat: ChatService) -> Router {
    let state = Arc::new(AppState {
        logs_dir: logs_dir.to_path_buf(),
        chat,
    });
    Router::new()
        .route("/health", get(health))
        .route("/logs/sessions", get(get_sessions))
        .route("/logs/sessions/{session_id}", get(get_session))
        .route("/logs/sessions/{session_id}/transcript", get(get_transcript))
        .route("/logs/sessions/{session_id}/events", get(get_events))
        .route("/chat/", post(post_chat))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Health ──

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

// ── GET /logs/sessions ──

async fn get_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    let events = ragscope_store::read_all_events(&state.logs_dir)?;
    Ok(Json(ragscope_store::list_sessions(&events)))
}

// ── GET /logs/sessions/{id} ──

/// Wire shape shared with clients that read sessions remotely.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionLogResponse {
    pub session_id: String,
    pub logs: Vec<LogEvent>,
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    UrlPath(session_id): UrlPath<String>,
) -> Result<Json<SessionLogResponse>, ApiError> {
    let logs = state.session_log(&session_id)?;
    Ok(Json(SessionLogResponse { session_id, logs }))
}

// ── GET /logs/sessions/{id}/transcript ──

#[derive(Serialize)]
struct TranscriptResponse {
    session_id: String,
    setup: EventRange,
    turns: Vec<Turn>,
    event_count: usize,
}

async fn get_transcript(
    State(state): State<Arc<AppState>>,
    UrlPath(session_id): UrlPath<String>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let log = state.session_log(&session_id)?;
    let transcript = Transcript::build(&log, &Partition::compute(&log));
    Ok(Json(TranscriptResponse {
        session_id,
        setup: transcript.setup,
        turns: transcript.turns,
        event_count: transcript.event_count,
    }))
}

// ── GET /logs/sessions/{id}/events ──

#[derive(Deserialize)]
struct EventsQuery {
    start: Option<usize>,
    end: Option<usize>,
}

#[derive(Serialize)]
struct EventsResponse {
    session_id: String,
    range: EventRange,
    events: Vec<LogEvent>,
}

async fn get_events(
    State(state): State<Arc<AppState>>,
    UrlPath(session_id): UrlPath<String>,
    Query(q): Query<EventsQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    let log = state.session_log(&session_id)?;
    let len = log.len();
    let end = q.end.unwrap_or(len).min(len);
    let start = q.start.unwrap_or(0).min(end);
    let range = EventRange::new(start, end);
    let events = slice(&log, range).to_vec();
    Ok(Json(EventsResponse {
        session_id,
        range,
        events,
    }))
}

// ── POST /chat/ ──

#[derive(Deserialize)]
struct ChatBody {
    question: String,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn post_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatReply>, ApiError> {
    let session = header_str(&headers, "x-session-id");
    let force_new = header_str(&headers, "x-new-session")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false);
    let reply = state.chat.exchange(session, force_new, &body.question)?;
    Ok(Json(reply))
}

// ── Tests ──
