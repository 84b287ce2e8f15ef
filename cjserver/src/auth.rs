//! Display login gate.
//!
//! Displays are protected by a per-location shared username/password. On
//! success the response carries an expiry timestamp (30 days by default)
//! that the display stores client side; nothing is kept server side. This
//! is a gate, not a security boundary.

use crate::locations::LocationRegistry;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Shared state of the login endpoint.
#[derive(Clone)]
pub struct AuthState {
    pub locations: Arc<LocationRegistry>,
    /// Client-side validity of a successful login, in days.
    pub session_days: u64,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub location: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub expires_at: DateTime<Utc>,
}

/// Creates the router for the login gate
pub fn create_router(state: AuthState) -> Router {
    Router::new()
        .route("/login", post(login))
        .with_state(state)
}

/// POST /api/login
/// Checks the per-location credentials; 401 with `success: false` on any
/// mismatch (including locations that never configured credentials).
async fn login(State(state): State<AuthState>, Json(request): Json<LoginRequest>) -> Response {
    let valid = state
        .locations
        .get(&request.location)
        .map(|location| {
            !location.username.is_empty()
                && location.username == request.username
                && location.password == request.password
        })
        .unwrap_or(false);

    if valid {
        info!(location = %request.location, "Display login accepted");
        let expires_at = Utc::now() + Duration::days(state.session_days as i64);
        Json(LoginResponse {
            success: true,
            expires_at,
        })
        .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "success": false,
                "message": "Invalid credentials"
            })),
        )
            .into_response()
    }
}
