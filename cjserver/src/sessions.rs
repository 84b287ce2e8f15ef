//! Display session endpoints.
//!
//! When the server hosts display sessions, these routes are the remote
//! playback surface: displays read the authoritative now-playing state and
//! report their player lifecycle back.
//!
//! SSE route type: `GET /api/locations/{location}/events/sse`

use crate::error::AppError;
use async_stream::stream;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cjsession::{PlayerEvent, SessionManager, SessionSnapshot};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

/// Shared state of the session endpoints.
#[derive(Clone)]
pub struct SessionState {
    pub sessions: Arc<SessionManager>,
}

/// Creates the router for the display session endpoints
pub fn create_router(state: SessionState) -> Router {
    Router::new()
        .route("/locations/{location}/now", get(now_playing))
        .route("/locations/{location}/events", post(player_event))
        .route("/locations/{location}/skip", post(skip))
        .route("/locations/{location}/reset", post(reset))
        .route("/locations/{location}/events/sse", get(events_sse))
        .with_state(state)
}

async fn session_for(
    state: &SessionState,
    location: &str,
) -> Result<Arc<cjsession::SessionHandle>, AppError> {
    state
        .sessions
        .get(location)
        .await
        .ok_or_else(|| AppError::not_found("No display session for this location"))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /api/locations/{location}/now
/// Authoritative playback snapshot for a display.
async fn now_playing(
    State(state): State<SessionState>,
    Path(location): Path<String>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let handle = session_for(&state, &location).await?;
    let snapshot = handle
        .snapshot()
        .await
        .map_err(|err| AppError::internal(err.to_string()))?;
    Ok(Json(snapshot))
}

/// POST /api/locations/{location}/events
/// Player lifecycle reported by a remote surface.
async fn player_event(
    State(state): State<SessionState>,
    Path(location): Path<String>,
    Json(event): Json<PlayerEvent>,
) -> Result<Json<serde_json::Value>, AppError> {
    debug!(location = %location, ?event, "Player event received");
    let handle = session_for(&state, &location).await?;
    handle
        .player_event(event)
        .await
        .map_err(|err| AppError::internal(err.to_string()))?;
    Ok(Json(serde_json::json!({"message": "accepted"})))
}

/// POST /api/locations/{location}/skip
async fn skip(
    State(state): State<SessionState>,
    Path(location): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let handle = session_for(&state, &location).await?;
    handle
        .skip()
        .await
        .map_err(|err| AppError::internal(err.to_string()))?;
    Ok(Json(serde_json::json!({"message": "accepted"})))
}

/// POST /api/locations/{location}/reset
async fn reset(
    State(state): State<SessionState>,
    Path(location): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let handle = session_for(&state, &location).await?;
    handle
        .reset()
        .await
        .map_err(|err| AppError::internal(err.to_string()))?;
    Ok(Json(serde_json::json!({"message": "accepted"})))
}

/// GET /api/locations/{location}/events/sse
/// Streams now-playing updates as server-sent events.
async fn events_sse(State(state): State<SessionState>, Path(location): Path<String>) -> Response {
    let handle = match session_for(&state, &location).await {
        Ok(handle) => handle,
        Err(err) => return err.into_response(),
    };

    let mut updates = handle.subscribe();
    let stream = stream! {
        while let Ok(update) = updates.recv().await {
            match serde_json::to_string(&update) {
                Ok(payload) => {
                    yield Ok::<Event, Infallible>(
                        Event::default().event("now_playing").data(payload),
                    );
                }
                Err(err) => {
                    debug!(error = %err, "Dropping unserialisable update");
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}
