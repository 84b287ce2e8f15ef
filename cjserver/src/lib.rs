//! # cjserver - HTTP surface for CrowdJuke
//!
//! Axum routers for the public form endpoints, the per-location login gate,
//! geolocation lookup and the hosted display sessions:
//!
//! - `POST /submit`, `GET /latest`, `GET /entries`, `POST /admin/clear`
//!   ([`submissions`])
//! - `POST /login` ([`auth`])
//! - `POST /locate` ([`locations`])
//! - `GET /locations/{id}/now`, `POST /locations/{id}/events`,
//!   `POST /locations/{id}/skip`, `POST /locations/{id}/reset`,
//!   `GET /locations/{id}/events/sse` ([`sessions`])
//!
//! Each concern builds its own router; [`api_router`] merges them for the
//! application binary, which nests the result under `/api`.

mod config_ext;
mod error;

pub mod auth;
pub mod locations;
pub mod sessions;
pub mod submissions;

use axum::Router;

// Public re-exports
pub use auth::AuthState;
pub use config_ext::ServerConfigExt;
pub use error::AppError;
pub use locations::{haversine_distance_m, Location, LocationRegistry};
pub use sessions::SessionState;
pub use submissions::SubmissionState;

/// Merges every concern's router into the complete API surface.
///
/// `sessions` is optional: a deployment that only accepts submissions (the
/// displays run elsewhere and poll remotely) simply hosts no session
/// routes.
pub fn api_router(
    submissions: SubmissionState,
    auth: AuthState,
    sessions: Option<SessionState>,
) -> Router {
    let mut router = Router::new()
        .merge(submissions::create_router(submissions.clone()))
        .merge(auth::create_router(auth))
        .merge(locations::create_router(submissions.locations));

    if let Some(sessions) = sessions {
        router = router.merge(sessions::create_router(sessions));
    }
    router
}
