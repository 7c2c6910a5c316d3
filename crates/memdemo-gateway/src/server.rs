use crate::routes;
use axum::{
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use memdemo_session::SessionManager;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state.
pub struct AppState {
    /// The session lifecycle API every handler delegates to.
    pub manager: Arc<SessionManager>,
}

/// Builds the demo API router.
///
/// CORS is wide open: the demo frontend is served from a different
/// origin than the API.
pub fn build_router(manager: Arc<SessionManager>) -> Router {
    let state = Arc::new(AppState { manager });
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/status", get(routes::pool_status_handler))
        .route("/api/session/create", post(routes::create_handler))
        .route("/api/session/{id}/chat", post(routes::chat_handler))
        .route(
            "/api/session/{id}/status",
            get(routes::session_status_handler),
        )
        .route(
            "/api/session/{id}",
            axum::routing::delete(routes::delete_handler),
        )
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "service": "memdemo"}))
}
