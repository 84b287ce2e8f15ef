//! Session worker: the single task owning one location's reconciler.
//!
//! Every event source for a location (poll results, player lifecycle,
//! user actions) funnels into the worker's command queue, so reconciler
//! transitions are applied strictly one at a time. The worker also owns the
//! session timers: the poll tick and the optional rotation countdown, both
//! of which die with the task.

use crate::error::{Error, Result};
use crate::poller::{PollOutcome, Poller};
use crate::surface::{PlaybackSurface, PlayerEvent};
use chrono::{DateTime, Utc};
use cjqueue::{
    LoadDirective, PlaybackState, Reconciler, ReconcilerEvent, ReconcilerOptions, RotationPolicy,
    Track, TrackLibrary,
};
use cjstore::SubmissionStore;
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, MissedTickBehavior, Sleep};
use tracing::{debug, info, warn};

/// Default poll period when a location does not configure one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

const COMMAND_QUEUE_DEPTH: usize = 32;
const UPDATE_CHANNEL_DEPTH: usize = 64;

/// Static configuration of one display session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub location_id: String,
    pub poll_interval: Duration,
    pub rotation: RotationPolicy,
}

impl SessionConfig {
    pub fn new(location_id: impl Into<String>) -> Self {
        Self {
            location_id: location_id.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            rotation: RotationPolicy::None,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn rotation(mut self, rotation: RotationPolicy) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Commands sent to the session worker.
#[derive(Debug)]
enum SessionCommand {
    Player(PlayerEvent),
    Skip,
    Reset,
    Snapshot(oneshot::Sender<SessionSnapshot>),
    PollFinished(cjstore::Result<Option<Track>>),
    Shutdown,
}

/// Serialisable view of a session's playback state.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub location_id: String,
    pub state: PlaybackState,
    pub now_playing: Option<Track>,
    pub pending_queue: Vec<Track>,
    pub is_library_track: bool,
    pub player_generation: u64,
    pub invalid_media_count: u64,
}

/// Broadcast notification emitted whenever a new directive is applied.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUpdate {
    pub location_id: String,
    pub track: Track,
    pub generation: u64,
    pub is_library_track: bool,
    pub at: DateTime<Utc>,
}

/// Handle to a running display session.
///
/// The worker stops when [`shutdown`] is called (waiting for the task) or
/// when the handle is dropped and the command channel closes.
///
/// [`shutdown`]: SessionHandle::shutdown
#[derive(Debug)]
pub struct SessionHandle {
    location_id: String,
    tx: mpsc::Sender<SessionCommand>,
    updates: broadcast::Sender<SessionUpdate>,
    join_handle: Mutex<Option<JoinHandle<()>>>,
}

impl SessionHandle {
    /// Spawns the worker task for one location.
    pub fn spawn(
        config: SessionConfig,
        store: Arc<dyn SubmissionStore>,
        library: Arc<TrackLibrary>,
        surface: Arc<dyn PlaybackSurface>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_DEPTH);

        let location_id = config.location_id.clone();
        let reconciler = Reconciler::new(
            &config.location_id,
            library,
            ReconcilerOptions {
                rotation: config.rotation,
            },
        );
        let poller = Poller::new(&config.location_id);

        let worker = SessionWorker {
            config,
            store,
            surface,
            reconciler,
            poller,
            poll_in_flight: false,
            rotation_restart: false,
            shutdown: false,
            tx: tx.clone(),
            updates: updates.clone(),
        };

        let join_handle = tokio::spawn(worker.run(rx));

        Self {
            location_id,
            tx,
            updates,
            join_handle: Mutex::new(Some(join_handle)),
        }
    }

    pub fn location_id(&self) -> &str {
        &self.location_id
    }

    /// Delivers a playback surface lifecycle event.
    pub async fn player_event(&self, event: PlayerEvent) -> Result<()> {
        self.send(SessionCommand::Player(event)).await
    }

    /// User action: jump to the next track immediately.
    pub async fn skip(&self) -> Result<()> {
        self.send(SessionCommand::Skip).await
    }

    /// User action: drop the queue and return to library playback.
    pub async fn reset(&self) -> Result<()> {
        self.send(SessionCommand::Reset).await
    }

    /// Current playback state, answered by the worker itself so it is never
    /// read mid-transition.
    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (reply, response) = oneshot::channel();
        self.send(SessionCommand::Snapshot(reply)).await?;
        response
            .await
            .map_err(|_| Error::SessionClosed(self.location_id.clone()))
    }

    /// Subscribes to now-playing updates (for SSE fan-out).
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }

    /// Stops the worker and waits for it to finish; session timers die with
    /// the task.
    pub async fn shutdown(&self) -> Result<()> {
        let _ = self.tx.send(SessionCommand::Shutdown).await;
        let handle = self.join_handle.lock().await.take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    return Err(Error::other(format!("session join error: {err}")));
                }
            }
        }
        Ok(())
    }

    async fn send(&self, command: SessionCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| Error::SessionClosed(self.location_id.clone()))
    }
}

struct SessionWorker {
    config: SessionConfig,
    store: Arc<dyn SubmissionStore>,
    surface: Arc<dyn PlaybackSurface>,
    reconciler: Reconciler,
    poller: Poller,
    poll_in_flight: bool,
    /// Set whenever a directive was applied; the run loop rebuilds the
    /// rotation countdown at the end of the iteration.
    rotation_restart: bool,
    shutdown: bool,
    tx: mpsc::Sender<SessionCommand>,
    updates: broadcast::Sender<SessionUpdate>,
}

impl SessionWorker {
    async fn run(mut self, mut rx: mpsc::Receiver<SessionCommand>) {
        info!(location = %self.config.location_id, "Starting display session");

        // The display starts on library content; an already queued
        // submission will preempt it on the first poll.
        let directive = self.reconciler.handle(ReconcilerEvent::Start);
        self.apply(directive).await;

        let mut poll_tick = tokio::time::interval(self.config.poll_interval);
        poll_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut rotation: Option<Pin<Box<Sleep>>> = None;
        if self.rotation_restart {
            rotation = self.rotation_sleep();
            self.rotation_restart = false;
        }

        loop {
            let mut rotation_fired = false;

            if let Some(countdown) = rotation.as_mut() {
                tokio::select! {
                    cmd = rx.recv() => match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => break,
                    },
                    _ = poll_tick.tick() => self.dispatch_poll(),
                    _ = countdown => rotation_fired = true,
                }
            } else {
                tokio::select! {
                    cmd = rx.recv() => match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => break,
                    },
                    _ = poll_tick.tick() => self.dispatch_poll(),
                }
            }

            if rotation_fired {
                debug!(location = %self.config.location_id, "Rotation countdown expired");
                rotation = None;
                let directive = self.reconciler.handle(ReconcilerEvent::TrackEnded);
                self.apply(directive).await;
            }
            if self.shutdown {
                break;
            }
            if self.rotation_restart {
                rotation = self.rotation_sleep();
                self.rotation_restart = false;
            }
        }

        info!(location = %self.config.location_id, "Display session stopped");
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Player(event) => match event {
                PlayerEvent::Ended => {
                    let directive = self.reconciler.handle(ReconcilerEvent::TrackEnded);
                    self.apply(directive).await;
                }
                PlayerEvent::Error { code } => {
                    let directive = self
                        .reconciler
                        .handle(ReconcilerEvent::PlaybackError { code });
                    self.apply(directive).await;
                }
                other => {
                    debug!(location = %self.config.location_id, ?other, "Player event ignored");
                }
            },
            SessionCommand::Skip => {
                let directive = self.reconciler.handle(ReconcilerEvent::Skip);
                self.apply(directive).await;
            }
            SessionCommand::Reset => {
                let directive = self.reconciler.handle(ReconcilerEvent::Reset);
                self.apply(directive).await;
            }
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            SessionCommand::PollFinished(result) => {
                self.poll_in_flight = false;
                match self.poller.classify(result) {
                    PollOutcome::NewTrack(track) => {
                        debug!(
                            location = %self.config.location_id,
                            track = %track.id,
                            "Poll surfaced a new submission"
                        );
                        let directive = self.reconciler.handle(ReconcilerEvent::NewTrack(track));
                        self.apply(directive).await;
                    }
                    PollOutcome::NoChange => {}
                    PollOutcome::Failed(err) => {
                        // Transient by contract: retried on the next tick.
                        warn!(
                            location = %self.config.location_id,
                            error = %err,
                            "Poll failed; retrying on next tick"
                        );
                    }
                }
            }
            SessionCommand::Shutdown => {
                self.shutdown = true;
            }
        }
    }

    /// Spawns a store fetch unless one is already in flight; the result
    /// comes back through the command queue.
    fn dispatch_poll(&mut self) {
        if self.poll_in_flight {
            debug!(location = %self.config.location_id, "Poll already in flight, skipping tick");
            return;
        }
        self.poll_in_flight = true;

        let store = Arc::clone(&self.store);
        let location_id = self.config.location_id.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = store.fetch_latest(&location_id).await;
            let _ = tx.send(SessionCommand::PollFinished(result)).await;
        });
    }

    async fn apply(&mut self, directive: Option<LoadDirective>) {
        let Some(directive) = directive else {
            return;
        };

        self.surface.load(&directive).await;
        // The countdown restarts on every now-playing change.
        self.rotation_restart = true;

        let _ = self.updates.send(SessionUpdate {
            location_id: self.config.location_id.clone(),
            track: directive.track,
            generation: directive.generation,
            is_library_track: self.reconciler.session().is_library_track,
            at: Utc::now(),
        });
    }

    fn rotation_sleep(&self) -> Option<Pin<Box<Sleep>>> {
        match self.config.rotation {
            RotationPolicy::FixedDuration(duration) => Some(Box::pin(sleep(duration))),
            RotationPolicy::None => None,
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        let session = self.reconciler.session();
        SessionSnapshot {
            location_id: session.location_id.clone(),
            state: session.state,
            now_playing: session.now_playing.clone(),
            pending_queue: session.pending_queue.iter().cloned().collect(),
            is_library_track: session.is_library_track,
            player_generation: session.player_generation,
            invalid_media_count: session.invalid_media_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cjqueue::LibraryEntry;
    use cjstore::{MemoryStore, NewSubmission};
    use std::sync::Mutex as StdMutex;

    /// Surface that records every directive it is told to load.
    #[derive(Debug, Default)]
    struct CollectingSurface {
        loads: StdMutex<Vec<LoadDirective>>,
    }

    impl CollectingSurface {
        fn loaded_ids(&self) -> Vec<String> {
            self.loads
                .lock()
                .unwrap()
                .iter()
                .map(|directive| directive.track.id.clone())
                .collect()
        }
    }

    #[async_trait]
    impl PlaybackSurface for CollectingSurface {
        async fn load(&self, directive: &LoadDirective) {
            self.loads.lock().unwrap().push(directive.clone());
        }
    }

    fn library() -> Arc<TrackLibrary> {
        Arc::new(
            TrackLibrary::new(vec![
                LibraryEntry {
                    id: "l1".into(),
                    title: "Track l1".into(),
                    media_ref: "https://youtu.be/00000000l01".into(),
                },
                LibraryEntry {
                    id: "l2".into(),
                    title: "Track l2".into(),
                    media_ref: "https://youtu.be/00000000l02".into(),
                },
            ])
            .unwrap(),
        )
    }

    fn submission(location: &str, media: &str) -> NewSubmission {
        NewSubmission {
            location_id: location.to_string(),
            media_ref: media.to_string(),
            submitted_by: "Asha".to_string(),
        }
    }

    fn session(
        store: Arc<MemoryStore>,
        config: SessionConfig,
    ) -> (SessionHandle, Arc<CollectingSurface>) {
        let surface = Arc::new(CollectingSurface::default());
        let handle = SessionHandle::spawn(config, store, library(), surface.clone());
        (handle, surface)
    }

    fn fast_config() -> SessionConfig {
        SessionConfig::new("dagapur").poll_interval(Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_session_starts_on_library_content() {
        let store = Arc::new(MemoryStore::new(["dagapur"]));
        let (handle, surface) = session(store, fast_config());

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state, PlaybackState::PlayingLibrary);
        assert!(snapshot.is_library_track);
        assert!(snapshot.now_playing.is_some());
        assert_eq!(surface.loaded_ids().len(), 1);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_poll_delivers_submission_which_preempts() {
        let store = Arc::new(MemoryStore::new(["dagapur"]));
        let (handle, surface) = session(store.clone(), fast_config());

        let track = store
            .insert(submission("dagapur", "https://youtu.be/aaaaaaaaaaa"))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state, PlaybackState::PlayingSubmitted);
        assert_eq!(snapshot.now_playing.unwrap().id, track.id);
        assert!(surface.loaded_ids().contains(&track.id));

        // Repeated polls of the same head do not re-trigger playback.
        let loads_before = surface.loaded_ids().len();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(surface.loaded_ids().len(), loads_before);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_player_ended_drains_queue_then_falls_back() {
        let store = Arc::new(MemoryStore::new(["dagapur"]));
        let (handle, _surface) = session(store.clone(), fast_config());

        store
            .insert(submission("dagapur", "https://youtu.be/aaaaaaaaaaa"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        let queued = store
            .insert(submission("dagapur", "https://youtu.be/bbbbbbbbbbb"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.pending_queue.len(), 1);

        handle.player_event(PlayerEvent::Ended).await.unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.now_playing.as_ref().unwrap().id, queued.id);
        assert!(snapshot.pending_queue.is_empty());

        handle.player_event(PlayerEvent::Ended).await.unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state, PlaybackState::PlayingLibrary);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_player_error_substitutes_library_track() {
        let store = Arc::new(MemoryStore::new(["dagapur"]));
        let (handle, _surface) = session(store.clone(), fast_config());

        store
            .insert(submission("dagapur", "https://youtu.be/aaaaaaaaaaa"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        handle
            .player_event(PlayerEvent::Error { code: Some(150) })
            .await
            .unwrap();

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state, PlaybackState::PlayingLibrary);
        assert_eq!(snapshot.invalid_media_count, 1);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_ready_and_paused_events_are_ignored() {
        let store = Arc::new(MemoryStore::new(["dagapur"]));
        let (handle, surface) = session(store, fast_config());

        handle.player_event(PlayerEvent::Ready).await.unwrap();
        handle.player_event(PlayerEvent::Paused).await.unwrap();
        handle.player_event(PlayerEvent::Playing).await.unwrap();

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.player_generation, 0);
        assert_eq!(surface.loaded_ids().len(), 1);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_skip_and_reset_commands() {
        let store = Arc::new(MemoryStore::new(["dagapur"]));
        let (handle, _surface) = session(store.clone(), fast_config());

        store
            .insert(submission("dagapur", "https://youtu.be/aaaaaaaaaaa"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        handle.skip().await.unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state, PlaybackState::PlayingLibrary);

        handle.reset().await.unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state, PlaybackState::PlayingLibrary);
        assert!(snapshot.pending_queue.is_empty());

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_rotation_forces_track_change() {
        let store = Arc::new(MemoryStore::new(["sevoke"]));
        let config = SessionConfig::new("sevoke")
            .poll_interval(Duration::from_millis(20))
            .rotation(RotationPolicy::FixedDuration(Duration::from_millis(80)));
        let surface = Arc::new(CollectingSurface::default());
        let handle = SessionHandle::spawn(config, store, library(), surface.clone());

        // No player event is ever delivered; the countdown alone rotates
        // through the library.
        tokio::time::sleep(Duration::from_millis(300)).await;

        let loads = surface.loaded_ids();
        assert!(
            loads.len() >= 3,
            "expected repeated rotation, got {loads:?}"
        );
        // Consecutive library picks never repeat with two entries.
        for pair in loads.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_updates_are_broadcast() {
        let store = Arc::new(MemoryStore::new(["dagapur"]));
        let (handle, _surface) = session(store.clone(), fast_config());
        let mut updates = handle.subscribe();

        let track = store
            .insert(submission("dagapur", "https://youtu.be/aaaaaaaaaaa"))
            .await
            .unwrap();

        // The subscription may race the initial library load; wait for the
        // submission update.
        let update = loop {
            let update = tokio::time::timeout(Duration::from_secs(2), updates.recv())
                .await
                .expect("update within deadline")
                .unwrap();
            if !update.is_library_track {
                break update;
            }
        };
        assert_eq!(update.location_id, "dagapur");
        assert_eq!(update.track.id, track.id);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_the_session() {
        let store = Arc::new(MemoryStore::new(["dagapur"]));
        let (handle, _surface) = session(store, fast_config());

        handle.shutdown().await.unwrap();

        let result = handle.player_event(PlayerEvent::Ended).await;
        assert!(matches!(result, Err(Error::SessionClosed(_))));
    }
}
