//! Location registry and geolocation lookup.
//!
//! A *location* is a physical venue with its own independent playback
//! queue. The registry is read from configuration; the `/locate` endpoint
//! resolves submitter coordinates to the nearest venue geofence so the form
//! can preselect it.

use crate::error::AppError;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use cjqueue::RotationPolicy;
use cjsession::SessionConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default poll period of a display page, in seconds.
fn default_poll_interval_secs() -> u64 {
    3
}

/// A venue with its own independent playback queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub display_name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Geofence radius in meters for submitter auto-detection.
    pub radius_m: f64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Maximum playback duration in seconds; absent means tracks play to
    /// their natural end.
    #[serde(default)]
    pub rotation_secs: Option<u64>,
    /// Display login credentials; empty disables the login gate.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Location {
    /// Session configuration for this venue's display.
    pub fn session_config(&self) -> SessionConfig {
        let rotation = match self.rotation_secs {
            Some(secs) => RotationPolicy::FixedDuration(Duration::from_secs(secs)),
            None => RotationPolicy::None,
        };
        SessionConfig::new(&self.id)
            .poll_interval(Duration::from_secs(self.poll_interval_secs.max(1)))
            .rotation(rotation)
    }
}

/// Read-only collection of configured venues.
#[derive(Debug, Clone)]
pub struct LocationRegistry {
    locations: Vec<Location>,
}

impl LocationRegistry {
    pub fn new(locations: Vec<Location>) -> Self {
        Self { locations }
    }

    pub fn get(&self, id: &str) -> Option<&Location> {
        let id = id.to_lowercase();
        self.locations.iter().find(|location| location.id == id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.locations
            .iter()
            .map(|location| location.id.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    /// Resolves coordinates to the first venue whose geofence contains
    /// them.
    pub fn locate(&self, latitude: f64, longitude: f64) -> Option<&Location> {
        self.locations.iter().find(|location| {
            haversine_distance_m(latitude, longitude, location.latitude, location.longitude)
                <= location.radius_m
        })
    }
}

/// Great-circle distance in meters (haversine, R = 6371 km).
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

// ============================================================================
// Route Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LocateRequest {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
pub struct LocateResponse {
    pub location: Option<String>,
}

/// Creates the router for geolocation lookup
pub fn create_router(registry: Arc<LocationRegistry>) -> Router {
    Router::new()
        .route("/locate", post(locate))
        .with_state(registry)
}

/// POST /api/locate
/// Resolves submitter coordinates to a venue name, or null when outside
/// every geofence.
async fn locate(
    State(registry): State<Arc<LocationRegistry>>,
    Json(request): Json<LocateRequest>,
) -> Result<Json<LocateResponse>, AppError> {
    let location = registry
        .locate(request.latitude, request.longitude)
        .map(|location| location.display_name.clone());

    Ok(Json(LocateResponse { location }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dagapur() -> Location {
        Location {
            id: "dagapur".into(),
            display_name: "Dagapur".into(),
            latitude: 26.749527184470193,
            longitude: 88.3937724490724,
            radius_m: 1000.0,
            poll_interval_secs: 3,
            rotation_secs: None,
            username: String::new(),
            password: String::new(),
        }
    }

    fn sevoke() -> Location {
        Location {
            id: "sevoke".into(),
            display_name: "Sevoke Road".into(),
            latitude: 26.747152888772344,
            longitude: 88.43802366441821,
            radius_m: 1000.0,
            poll_interval_secs: 1,
            rotation_secs: Some(300),
            username: String::new(),
            password: String::new(),
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        // The two venues are roughly 4.4 km apart.
        let d = haversine_distance_m(
            26.749527184470193,
            88.3937724490724,
            26.747152888772344,
            88.43802366441821,
        );
        assert!((4000.0..5000.0).contains(&d), "distance was {d}");

        // Zero distance from a point to itself.
        assert!(haversine_distance_m(26.75, 88.39, 26.75, 88.39) < 1e-6);
    }

    #[test]
    fn test_locate_within_geofence() {
        let registry = LocationRegistry::new(vec![dagapur(), sevoke()]);

        // A point a few hundred meters from Dagapur.
        let hit = registry.locate(26.7500, 88.3940).unwrap();
        assert_eq!(hit.id, "dagapur");

        // A point well outside both geofences.
        assert!(registry.locate(27.5, 89.0).is_none());
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let registry = LocationRegistry::new(vec![dagapur()]);
        assert!(registry.get("Dagapur").is_some());
        assert!(registry.get("DAGAPUR").is_some());
        assert!(registry.get("nowhere").is_none());
    }

    #[test]
    fn test_session_config_mapping() {
        let config = sevoke().session_config();
        assert_eq!(config.location_id, "sevoke");
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(
            config.rotation,
            RotationPolicy::FixedDuration(Duration::from_secs(300))
        );

        let config = dagapur().session_config();
        assert_eq!(config.rotation, RotationPolicy::None);
    }

    #[tokio::test]
    async fn test_locate_handler() {
        let registry = Arc::new(LocationRegistry::new(vec![dagapur(), sevoke()]));

        let found = locate(
            State(registry.clone()),
            Json(LocateRequest {
                latitude: 26.7500,
                longitude: 88.3940,
            }),
        )
        .await
        .unwrap();
        assert_eq!(found.0.location.as_deref(), Some("Dagapur"));

        let missed = locate(
            State(registry),
            Json(LocateRequest {
                latitude: 0.0,
                longitude: 0.0,
            }),
        )
        .await
        .unwrap();
        assert!(missed.0.location.is_none());
    }
}
