//! Registry of live display sessions.

use crate::error::{Error, Result};
use crate::surface::PlaybackSurface;
use crate::worker::{SessionConfig, SessionHandle};
use cjqueue::TrackLibrary;
use cjstore::SubmissionStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Registry of live display sessions, one per location.
///
/// Sessions share the submission store and the track library (read-only);
/// each keeps its own independent playback state.
#[derive(Debug)]
pub struct SessionManager {
    store: Arc<dyn SubmissionStore>,
    library: Arc<TrackLibrary>,
    sessions: RwLock<HashMap<String, Arc<SessionHandle>>>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SubmissionStore>, library: Arc<TrackLibrary>) -> Self {
        Self {
            store,
            library,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Opens a session for a location.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionExists`] when the location already has one.
    pub async fn open(
        &self,
        config: SessionConfig,
        surface: Arc<dyn PlaybackSurface>,
    ) -> Result<Arc<SessionHandle>> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&config.location_id) {
            return Err(Error::SessionExists(config.location_id));
        }

        let location_id = config.location_id.clone();
        let handle = Arc::new(SessionHandle::spawn(
            config,
            Arc::clone(&self.store),
            Arc::clone(&self.library),
            surface,
        ));
        sessions.insert(location_id, Arc::clone(&handle));
        Ok(handle)
    }

    /// Handle of the location's session, if one is open.
    pub async fn get(&self, location_id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.read().await.get(location_id).cloned()
    }

    /// Location ids with an open session.
    pub async fn locations(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    /// Closes one location's session, stopping its worker and timers.
    pub async fn close(&self, location_id: &str) -> Result<()> {
        let removed = self.sessions.write().await.remove(location_id);
        match removed {
            Some(handle) => handle.shutdown().await,
            None => Err(Error::SessionClosed(location_id.to_string())),
        }
    }

    /// Stops every session; used on server shutdown.
    pub async fn shutdown_all(&self) {
        let handles: Vec<_> = self.sessions.write().await.drain().collect();
        for (location_id, handle) in handles {
            info!(location = %location_id, "Stopping display session");
            if let Err(err) = handle.shutdown().await {
                tracing::warn!(location = %location_id, error = %err, "Session shutdown failed");
            }
        }
    }
}
