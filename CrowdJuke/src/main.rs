use cjconfig::get_config;
use cjqueue::LibraryConfigExt;
use cjserver::{AuthState, ServerConfigExt, SessionState, SubmissionState};
use cjsession::{LoggingSurface, SessionManager};
use cjstore::{MemoryStore, SubmissionStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ========== PHASE 1 : Configuration & logging ==========

    let config = get_config();

    let min_level = config.get_log_min_level()?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(min_level.to_lowercase()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("📡 Loading venue registry and track library...");
    let registry = Arc::new(config.get_location_registry()?);
    let library = Arc::new(config.get_track_library()?);
    info!(
        "✅ {} venue(s) configured, {} library track(s)",
        registry.ids().len(),
        library.len()
    );

    // ========== PHASE 2 : Stores & display sessions ==========

    let store: Arc<dyn SubmissionStore> = Arc::new(MemoryStore::new(registry.ids()));

    info!("🎵 Opening display sessions...");
    let sessions = Arc::new(SessionManager::new(
        Arc::clone(&store),
        Arc::clone(&library),
    ));
    for location in registry.iter() {
        sessions
            .open(location.session_config(), Arc::new(LoggingSurface))
            .await?;
        info!("  - {} ({})", location.display_name, location.id);
    }

    // ========== PHASE 3 : HTTP server ==========

    let cron_key = config.get_cron_key()?;
    let submissions = SubmissionState {
        store,
        locations: Arc::clone(&registry),
        retention: Duration::from_secs(config.get_retention_hours()? * 3600),
        cron_key: (!cron_key.is_empty()).then_some(cron_key),
    };
    let auth = AuthState {
        locations: Arc::clone(&registry),
        session_days: config.get_auth_session_days()?,
    };
    let session_state = SessionState {
        sessions: Arc::clone(&sessions),
    };

    let app = axum::Router::new()
        .route(
            "/info",
            axum::routing::get(|| async {
                axum::Json(serde_json::json!({"version": env!("CARGO_PKG_VERSION")}))
            }),
        )
        .nest(
            "/api",
            cjserver::api_router(submissions, auth, Some(session_state)),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.get_http_port()));
    info!(
        "🌐 CrowdJuke running at {}:{}",
        config.get_base_url(),
        config.get_http_port()
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.expect("failed to listen for ctrl_c");
            info!("Ctrl+C received, shutting down");
        })
        .await?;

    // ========== PHASE 4 : Graceful teardown ==========

    sessions.shutdown_all().await;
    info!("✅ CrowdJuke stopped");

    Ok(())
}
