//! Queue reconciliation state machine.
//!
//! One [`Reconciler`] instance owns the playback state of a single location:
//! which track is playing, which submissions are queued, and when to fall
//! back to the track library. It consumes discrete events (poll results,
//! player lifecycle, user actions) and emits [`LoadDirective`]s for the
//! playback surface.
//!
//! Transitions are synchronous and applied one at a time; the session worker
//! serialises every event source for a location through this type. A
//! directive is emitted only when the `(media_ref, generation)` pair actually
//! changed, so an already playing track is never reloaded.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::library::TrackLibrary;
use crate::media;
use crate::track::{Track, TrackOrigin};

/// Discriminant of the per-location playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Initial state: nothing has been played yet.
    AwaitingFirstTrack,
    /// The current track is a patron submission.
    PlayingSubmitted,
    /// The current track is filler content from the library.
    PlayingLibrary,
    /// Transient: entered on invalid media or a player error, resolved to
    /// `PlayingLibrary` within the same reconciliation step.
    Recovering,
}

/// Optional forced track change, independent of natural track end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationPolicy {
    /// Tracks play to their natural end.
    None,
    /// Force a track change after the given playback duration. The countdown
    /// restarts on every now-playing change.
    FixedDuration(Duration),
}

/// Events consumed by the reconciler.
#[derive(Debug, Clone)]
pub enum ReconcilerEvent {
    /// First reconciliation tick of a session.
    Start,
    /// The poller surfaced a submission it has not delivered before.
    NewTrack(Track),
    /// The playback surface finished the current track, or the rotation
    /// countdown expired.
    TrackEnded,
    /// The playback surface failed to play the current media.
    PlaybackError { code: Option<i32> },
    /// User action: force the equivalent of a track end.
    Skip,
    /// User action: drop the pending queue and return to library playback.
    Reset,
}

/// Instruction for the playback surface.
#[derive(Debug, Clone, Serialize)]
pub struct LoadDirective {
    pub track: Track,
    /// Surface identity. A changed generation means the surface must be torn
    /// down and recreated, even for an identical media ref.
    pub generation: u64,
    pub autoplay: bool,
}

/// Per-location runtime playback state.
///
/// Owned exclusively by the reconciler and never persisted: a session
/// restart forgets the queue and resumes from library playback.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub location_id: String,
    pub state: PlaybackState,
    pub now_playing: Option<Track>,
    /// Submitted tracks not yet played, ordered by `submitted_at` ascending;
    /// ties preserve arrival order.
    pub pending_queue: VecDeque<Track>,
    pub is_library_track: bool,
    /// Most recently selected library track, excluded from the next
    /// selection to avoid immediate repeats.
    pub last_library_track_id: Option<String>,
    pub player_generation: u64,
    /// Diagnostics: how many times playback was recovered via library
    /// fallback (malformed refs and player errors).
    pub invalid_media_count: u64,
}

impl PlaybackSession {
    fn new(location_id: String) -> Self {
        Self {
            location_id,
            state: PlaybackState::AwaitingFirstTrack,
            now_playing: None,
            pending_queue: VecDeque::new(),
            is_library_track: false,
            last_library_track_id: None,
            player_generation: 0,
            invalid_media_count: 0,
        }
    }
}

/// Options for a reconciler instance.
#[derive(Debug, Clone)]
pub struct ReconcilerOptions {
    pub rotation: RotationPolicy,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            rotation: RotationPolicy::None,
        }
    }
}

/// The queue-resolution state machine for one location.
pub struct Reconciler {
    library: Arc<TrackLibrary>,
    options: ReconcilerOptions,
    session: PlaybackSession,
    rng: StdRng,
    /// `(media_ref, generation)` of the last emitted directive.
    last_emitted: Option<(String, u64)>,
}

impl Reconciler {
    pub fn new(
        location_id: impl Into<String>,
        library: Arc<TrackLibrary>,
        options: ReconcilerOptions,
    ) -> Self {
        Self {
            library,
            options,
            session: PlaybackSession::new(location_id.into()),
            rng: StdRng::from_os_rng(),
            last_emitted: None,
        }
    }

    /// Current playback state.
    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    /// Rotation policy this location was configured with. The countdown
    /// itself is driven by the session worker.
    pub fn rotation(&self) -> RotationPolicy {
        self.options.rotation
    }

    /// Applies one event and returns the load directive, if the playback
    /// surface must (re)load media.
    pub fn handle(&mut self, event: ReconcilerEvent) -> Option<LoadDirective> {
        match event {
            ReconcilerEvent::Start => self.start(),
            ReconcilerEvent::NewTrack(track) => self.accept(track),
            ReconcilerEvent::TrackEnded => self.advance(),
            ReconcilerEvent::Skip => {
                debug!(location = %self.session.location_id, "Skip requested");
                self.advance()
            }
            ReconcilerEvent::PlaybackError { code } => self.recover(code),
            ReconcilerEvent::Reset => self.reset(),
        }
    }

    /// First tick with nothing playing starts on library content.
    fn start(&mut self) -> Option<LoadDirective> {
        if self.session.now_playing.is_some() {
            return None;
        }
        self.fallback_to_library(false);
        self.checked_emit()
    }

    /// A newly surfaced submission either preempts filler
    /// content or merges into the pending queue.
    fn accept(&mut self, track: Track) -> Option<LoadDirective> {
        match self.session.state {
            PlaybackState::AwaitingFirstTrack | PlaybackState::PlayingLibrary => {
                info!(
                    location = %self.session.location_id,
                    track = %track.id,
                    "Submission preempts library playback"
                );
                self.set_now_playing(track, PlaybackState::PlayingSubmitted, true);
                self.checked_emit()
            }
            PlaybackState::PlayingSubmitted | PlaybackState::Recovering => self.merge(track),
        }
    }

    /// Never interrupt a playing submission. Duplicate deliveries
    /// update in place; new tracks keep the queue sorted by arrival time.
    fn merge(&mut self, track: Track) -> Option<LoadDirective> {
        if let Some(current) = self.session.now_playing.as_mut() {
            if current.id == track.id {
                // Refresh fields without re-triggering playback.
                debug!(
                    location = %self.session.location_id,
                    track = %track.id,
                    "Duplicate delivery of the current track"
                );
                *current = track;
                return None;
            }
        }

        if let Some(existing) = self
            .session
            .pending_queue
            .iter_mut()
            .find(|queued| queued.id == track.id)
        {
            // Idempotent on duplicate delivery: same queue position.
            *existing = track;
            return None;
        }

        let key = track.queue_key();
        let position = self
            .session
            .pending_queue
            .iter()
            .position(|queued| queued.queue_key() > key)
            .unwrap_or(self.session.pending_queue.len());

        debug!(
            location = %self.session.location_id,
            track = %track.id,
            position,
            "Queued submission"
        );
        self.session.pending_queue.insert(position, track);
        None
    }

    /// The current track is over (naturally, by rotation, or
    /// by skip). Drain the queue head or fall back to the library.
    fn advance(&mut self) -> Option<LoadDirective> {
        if self.session.now_playing.is_none() {
            // An end event can only follow a load; treat a stray one as the
            // first tick.
            return self.start();
        }

        if let Some(next) = self.session.pending_queue.pop_front() {
            debug!(
                location = %self.session.location_id,
                track = %next.id,
                remaining = self.session.pending_queue.len(),
                "Advancing to the next queued submission"
            );
            self.session.last_library_track_id = None;
            self.set_now_playing(next, PlaybackState::PlayingSubmitted, false);
        } else {
            self.fallback_to_library(false);
        }
        self.checked_emit()
    }

    /// Invalid media or a player error always resolves to library
    /// playback, whatever the current state. The surface may be wedged, so
    /// the generation is bumped to force a rebuild.
    fn recover(&mut self, code: Option<i32>) -> Option<LoadDirective> {
        self.session.state = PlaybackState::Recovering;
        self.session.invalid_media_count += 1;
        warn!(
            location = %self.session.location_id,
            ?code,
            recoveries = self.session.invalid_media_count,
            "Playback failed, substituting a library track"
        );
        self.fallback_to_library(true);
        self.emit()
    }

    /// Drop the queue, return to library playback.
    fn reset(&mut self) -> Option<LoadDirective> {
        info!(
            location = %self.session.location_id,
            dropped = self.session.pending_queue.len(),
            "Reset requested"
        );
        self.session.pending_queue.clear();
        self.fallback_to_library(false);
        self.checked_emit()
    }

    /// Selects the next library track (avoiding an immediate repeat) and
    /// makes it the current one.
    fn fallback_to_library(&mut self, force_reload: bool) {
        let entry = self
            .library
            .pick_next(self.session.last_library_track_id.as_deref(), &mut self.rng);
        let track = entry.to_track(&self.session.location_id);
        self.session.last_library_track_id = Some(track.id.clone());
        self.set_now_playing(track, PlaybackState::PlayingLibrary, force_reload);
    }

    fn set_now_playing(&mut self, track: Track, state: PlaybackState, force_reload: bool) {
        let same_media = self
            .session
            .now_playing
            .as_ref()
            .map(|current| current.media_ref == track.media_ref)
            .unwrap_or(false);

        // A surface cannot detect a reload of the same media without a fresh
        // identity.
        if force_reload || same_media {
            self.session.player_generation += 1;
        }

        self.session.is_library_track = track.origin == TrackOrigin::Library;
        self.session.now_playing = Some(track);
        self.session.state = state;
    }

    /// Emits for the current track, unless its media ref is unplayable, in
    /// which case the error recovery path applies within the same step.
    fn checked_emit(&mut self) -> Option<LoadDirective> {
        let playable = self
            .session
            .now_playing
            .as_ref()
            .map(|track| media::is_playable(&track.media_ref))
            .unwrap_or(true);

        if playable {
            self.emit()
        } else {
            self.recover(None)
        }
    }

    fn emit(&mut self) -> Option<LoadDirective> {
        let track = self.session.now_playing.as_ref()?;
        let signature = (track.media_ref.clone(), self.session.player_generation);

        if self.last_emitted.as_ref() == Some(&signature) {
            return None;
        }
        self.last_emitted = Some(signature);

        Some(LoadDirective {
            track: track.clone(),
            generation: self.session.player_generation,
            autoplay: true,
        })
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("session", &self.session)
            .field("rotation", &self.options.rotation)
            .finish()
    }
}
