//! HTTP request handlers.

use axum::{
    Json,
    extract::{Query, Request, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{info, instrument};

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::session::{SessionSummary, SourceChannels};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions: usize,
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sessions: state.registry.len(),
    })
}

/// Serve the overlay page for a channel set.
///
/// The session is resolved first so its sources start connecting while the
/// page loads.
///
/// GET /chat?twitch=&youtube=
#[instrument(skip(state, request))]
pub async fn chat_widget(
    State(state): State<AppState>,
    Query(channels): Query<SourceChannels>,
    request: Request,
) -> ApiResult<Response> {
    let session = state.registry.resolve(&channels)?;
    info!(session = %session.key(), "Serving chat widget");

    let Ok(response) = ServeFile::new(&state.widget_path).oneshot(request).await;
    if response.status() == StatusCode::NOT_FOUND {
        return Err(ApiError::service_unavailable(format!(
            "Chat widget not found at {}",
            state.widget_path.display()
        )));
    }
    Ok(response.into_response())
}

/// List live sessions.
///
/// GET /api/sessions
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(state.registry.snapshot().await)
}

/// JSON 404 for unmatched routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(uri.path())
}
