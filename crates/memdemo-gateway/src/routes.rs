use crate::server::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use memdemo_core::{DemoError, KeyMode};
use memdemo_engine::EngineCredential;
use memdemo_session::{format_remaining, CreateParams};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Request body for `POST /api/session/create`. Mirrors what the demo
/// frontend sends.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Contact email of the caller.
    pub email: String,
    /// Context text the session's memory is built from.
    pub context_text: String,
    /// Whether the caller supplies their own API key.
    pub use_own_key: bool,
    /// Caller's API key (BYOK mode only).
    #[serde(default)]
    pub api_key: Option<String>,
    /// Optional OpenAI-compatible base URL (BYOK mode only).
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Request body for `POST /api/session/{id}/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    /// The user's message.
    pub message: String,
}

/// Maps a typed lifecycle error onto the transport's status code
/// families: bad input, not-found/gone, resource exhaustion, internal.
fn error_response(err: &DemoError) -> Response {
    let status = match err {
        DemoError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        DemoError::NotFound => StatusCode::NOT_FOUND,
        DemoError::Expired => StatusCode::GONE,
        DemoError::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
        DemoError::CapacityExceeded { .. } => StatusCode::SERVICE_UNAVAILABLE,
        DemoError::Misconfigured(_)
        | DemoError::Engine(_)
        | DemoError::Config(_)
        | DemoError::Json(_)
        | DemoError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({"detail": err.to_string()}))).into_response()
}

/// `GET /api/status` — pool occupancy.
pub async fn pool_status_handler(State(state): State<Arc<AppState>>) -> Response {
    Json(state.manager.pool_status().await).into_response()
}

/// `POST /api/session/create`.
pub async fn create_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Response {
    if !req.email.contains('@') {
        return error_response(&DemoError::InvalidRequest(
            "a valid contact email is required".to_string(),
        ));
    }

    let key_mode = if req.use_own_key {
        KeyMode::BringOwnKey
    } else {
        KeyMode::ServerKey
    };
    let credential = req.api_key.map(|api_key| EngineCredential {
        api_key,
        base_url: req.base_url,
    });

    let params = CreateParams {
        owner: req.email,
        key_mode,
        credential,
        context_text: req.context_text,
    };

    match state.manager.create(params).await {
        Ok(created) => Json(serde_json::json!({
            "session_id": created.session_id,
            "max_turns": created.turn_limit,
            "expires_at": created.expires_at,
            "remaining_time": format_remaining(created.remaining_secs),
        }))
        .into_response(),
        Err(err) => {
            warn!(error = %err, "Session create rejected");
            error_response(&err)
        }
    }
}

/// `POST /api/session/{id}/chat`.
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(msg): Json<ChatMessage>,
) -> Response {
    match state.manager.chat(id, &msg.message).await {
        Ok(reply) => Json(serde_json::json!({
            "response": reply.response,
            "turn_count": reply.turn_count,
            "max_turns": reply.turn_limit,
            "session_remaining_time": format_remaining(reply.remaining_secs),
        }))
        .into_response(),
        Err(err) => error_response(&err),
    }
}

/// `GET /api/session/{id}/status`.
pub async fn session_status_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.manager.status(id).await {
        Ok(status) => Json(serde_json::json!({
            "session_id": status.session_id,
            "turn_count": status.turn_count,
            "max_turns": status.turn_limit,
            "expires_at": status.expires_at,
            "remaining_time": format_remaining(status.remaining_secs),
            "can_chat": status.can_chat,
        }))
        .into_response(),
        Err(err) => error_response(&err),
    }
}

/// `DELETE /api/session/{id}` — idempotent, always succeeds.
pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    state.manager.delete(id).await;
    Json(serde_json::json!({"message": "Session deleted successfully"})).into_response()
}
