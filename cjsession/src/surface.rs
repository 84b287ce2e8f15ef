//! Playback surface seam.
//!
//! The playback surface is the embeddable media player on a display: it
//! accepts a media reference plus autoplay flag and reports lifecycle
//! events. The session worker only ever pushes [`LoadDirective`]s at it;
//! events travel back through [`SessionHandle::player_event`].
//!
//! [`SessionHandle::player_event`]: crate::SessionHandle::player_event

use async_trait::async_trait;
use cjqueue::LoadDirective;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::info;

/// Lifecycle events reported by a playback surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerEvent {
    Ready,
    Playing,
    Paused,
    Ended,
    Error { code: Option<i32> },
}

/// Seam towards the embeddable media player.
#[async_trait]
pub trait PlaybackSurface: Debug + Send + Sync {
    /// Loads (or reloads) media.
    ///
    /// Called from the session worker task; implementations must return
    /// promptly and never block on playback itself.
    async fn load(&self, directive: &LoadDirective);
}

/// Surface that only logs directives.
///
/// Used for headless deployments where the actual player is a remote
/// display following the session snapshot/SSE endpoints.
#[derive(Debug, Default)]
pub struct LoggingSurface;

#[async_trait]
impl PlaybackSurface for LoggingSurface {
    async fn load(&self, directive: &LoadDirective) {
        info!(
            location = %directive.track.location_id,
            track = %directive.track.id,
            title = %directive.track.title,
            generation = directive.generation,
            library = directive.track.is_library(),
            "Loading media"
        );
    }
}
