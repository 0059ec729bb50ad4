//! REST endpoints for the hobby discovery chat.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::{ConfigError, SessionError};

use super::state::{MessageType, SessionSnapshot};
use super::store::SessionStore;

/// Shared state for chat routes.
#[derive(Clone)]
pub struct ChatRouteState {
    pub store: Arc<SessionStore>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub message_type: MessageType,
    pub is_complete: bool,
}

#[derive(Debug, Deserialize)]
struct ResetParams {
    session_id: String,
}

/// Error body returned by every endpoint: `{"detail": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
            Self::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound { .. } => Self::NotFound("Session not found".to_string()),
            SessionError::TurnAborted { .. } => {
                Self::Internal("Error processing message".to_string())
            }
        }
    }
}

/// POST /api/chat
///
/// Runs one turn. A session id is generated when the caller sends none.
async fn chat(
    State(state): State<ChatRouteState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    // Detached from the request: the turn finishes even if the client
    // disconnects, and a panic becomes a 500.
    let store = Arc::clone(&state.store);
    let id = session_id.clone();
    let message = request.message;
    let outcome = tokio::spawn(async move { store.advance(&id, &message).await })
        .await
        .map_err(|e| {
            error!(session_id = %session_id, error = %e, "Chat turn aborted");
            SessionError::TurnAborted {
                id: session_id.clone(),
                reason: e.to_string(),
            }
        })?;

    Ok(Json(ChatResponse {
        response: outcome.response,
        session_id: outcome.session_id,
        message_type: outcome.message_type,
        is_complete: outcome.is_complete,
    }))
}

/// GET /api/health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "message": "Hobby Discovery Chatbot API is running"
    }))
}

/// POST /api/reset-session?session_id=...
///
/// Succeeds whether or not the session existed.
async fn reset_session(
    State(state): State<ChatRouteState>,
    Query(params): Query<ResetParams>,
) -> impl IntoResponse {
    let existed = state.store.reset(&params.session_id).await;
    info!(session_id = %params.session_id, existed, "Reset requested");
    Json(serde_json::json!({
        "message": "Session reset successfully",
        "session_id": params.session_id
    }))
}

/// GET /api/session/{session_id}
async fn get_session(
    State(state): State<ChatRouteState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.store.get(&session_id).await?))
}

/// Build the chat REST routes.
pub fn chat_routes(state: ChatRouteState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/health", get(health))
        .route("/api/reset-session", post(reset_session))
        .route("/api/session/{session_id}", get(get_session))
        .with_state(state)
}

/// CORS for the single configured browser origin. Any method and header is
/// allowed for that origin, with credentials.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, ConfigError> {
    let origin = HeaderValue::from_str(origin).map_err(|e| ConfigError::InvalidValue {
        key: "HOBBY_GUIDE_CORS_ORIGIN".to_string(),
        message: e.to_string(),
    })?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

/// The full application: chat routes behind the CORS layer.
pub fn app(store: Arc<SessionStore>, server: &ServerConfig) -> Result<Router, ConfigError> {
    let cors = cors_layer(&server.cors_origin)?;
    Ok(chat_routes(ChatRouteState { store }).layer(ServiceBuilder::new().layer(cors)))
}
