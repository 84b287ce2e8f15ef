//! Submission form endpoints.
//!
//! The wire format mirrors the public form: `POST /submit` takes
//! `{location, youtubeLink, name}` and answers 400 with
//! `{"error":"duplicate_song"}` or `{"error":"Invalid location"}` on
//! rejection. Reads are `GET /latest` (the store head for a location) and
//! `GET /entries` (the retention window, newest first).

use crate::error::AppError;
use crate::locations::LocationRegistry;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use cjqueue::{media, Track};
use cjstore::{SubmissionStore, SubmitRequest, SubmitResponse};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Shared state of the submission endpoints.
#[derive(Clone)]
pub struct SubmissionState {
    pub store: Arc<dyn SubmissionStore>,
    pub locations: Arc<LocationRegistry>,
    /// Window answered by `GET /entries`.
    pub retention: Duration,
    /// Shared secret for `POST /admin/clear`; `None` disables the endpoint.
    pub cron_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub location: String,
}

#[derive(Debug, Deserialize)]
pub struct ClearQuery {
    #[serde(default)]
    pub location: Option<String>,
}

/// Creates the router for the submission endpoints
pub fn create_router(state: SubmissionState) -> Router {
    Router::new()
        .route("/submit", post(submit))
        .route("/latest", get(latest))
        .route("/entries", get(entries))
        .route("/admin/clear", post(clear))
        .with_state(state)
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST /api/submit
/// Validates the link shape, then persists the submission.
async fn submit(
    State(state): State<SubmissionState>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::bad_request("Name is required"));
    }
    if !media::is_valid_link(request.youtube_link.trim()) {
        return Err(AppError::bad_request("Invalid YouTube link"));
    }

    match state.store.insert(request.into_submission()).await {
        Ok(track) => {
            info!(
                location = %track.location_id,
                track = %track.id,
                "Accepted submission"
            );
            Ok(Json(SubmitResponse {
                message: "Data saved successfully".to_string(),
                track,
            }))
        }
        Err(cjstore::Error::DuplicateSubmission) => Err(AppError::bad_request("duplicate_song")),
        Err(cjstore::Error::InvalidLocation(_)) => Err(AppError::bad_request("Invalid location")),
        Err(err) => {
            warn!(error = %err, "Submission failed");
            Err(AppError::internal("Unable to save data"))
        }
    }
}

/// GET /api/latest?location=
/// The newest submission for a location; 404 when the store is empty.
async fn latest(
    State(state): State<SubmissionState>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<Track>, AppError> {
    match state.store.fetch_latest(&query.location).await {
        Ok(Some(track)) => Ok(Json(track)),
        Ok(None) => Err(AppError::not_found(
            "No data found for the specified location",
        )),
        Err(err) => {
            warn!(error = %err, "Latest lookup failed");
            Err(AppError::internal("Unable to fetch data"))
        }
    }
}

/// GET /api/entries?location=
/// Submissions within the retention window, newest first.
async fn entries(
    State(state): State<SubmissionState>,
    Query(query): Query<LocationQuery>,
) -> Result<Json<Vec<Track>>, AppError> {
    state
        .store
        .recent(&query.location, state.retention)
        .await
        .map(Json)
        .map_err(|err| {
            warn!(error = %err, "Entries lookup failed");
            AppError::internal("Error connecting to the store")
        })
}

/// POST /api/admin/clear?location=
/// Drops stored submissions, guarded by the `x-cron-key` header. Without a
/// `location` query every configured venue is cleared.
async fn clear(
    State(state): State<SubmissionState>,
    Query(query): Query<ClearQuery>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let Some(expected) = state.cron_key.as_deref().filter(|key| !key.is_empty()) else {
        return Err(AppError::unauthorized("Unauthorized"));
    };

    let provided = headers
        .get("x-cron-key")
        .and_then(|value| value.to_str().ok());
    if provided != Some(expected) {
        return Err(AppError::unauthorized("Unauthorized"));
    }

    let targets = match query.location {
        Some(location) => vec![location],
        None => state.locations.ids(),
    };

    let mut dropped = 0;
    for location in &targets {
        dropped += state.store.clear(location).await.map_err(|err| {
            warn!(error = %err, "Clear failed");
            AppError::internal("Error connecting to the store")
        })?;
    }

    info!(?targets, dropped, "Cleared submissions");
    Ok(Json(serde_json::json!({
        "message": "Collections cleared successfully",
        "dropped": dropped,
        "timestamp": Utc::now(),
    })))
}
