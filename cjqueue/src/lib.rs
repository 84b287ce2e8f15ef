//! # cjqueue - queue resolution core for CrowdJuke
//!
//! This crate implements the part of CrowdJuke that decides, at any moment,
//! which track a location's display should be playing:
//!
//! - **Track model**: one playable item, from the fallback library or from a
//!   patron submission
//! - **Track library**: immutable fallback set with no-immediate-repeat
//!   random selection
//! - **Reconciler**: the per-location state machine merging poll results,
//!   player lifecycle events and user actions into a single playback intent
//!
//! The reconciler is deliberately synchronous and single-threaded: all event
//! sources for a location must funnel through one [`Reconciler`] instance,
//! one event at a time. The async plumbing (polling, timers, player event
//! delivery) lives in `cjsession`.
//!
//! # Example
//!
//! ```
//! use cjqueue::{Reconciler, ReconcilerEvent, ReconcilerOptions, TrackLibrary, LibraryEntry};
//! use std::sync::Arc;
//!
//! # fn main() -> cjqueue::Result<()> {
//! let library = Arc::new(TrackLibrary::new(vec![
//!     LibraryEntry {
//!         id: "lib_1".into(),
//!         title: "Song 1".into(),
//!         media_ref: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".into(),
//!     },
//! ])?);
//!
//! let mut reconciler = Reconciler::new("dagapur", library, ReconcilerOptions::default());
//!
//! // First tick: the display starts on library content.
//! let directive = reconciler.handle(ReconcilerEvent::Start);
//! assert!(directive.is_some());
//! # Ok(())
//! # }
//! ```

mod error;
mod library;
pub mod media;
mod reconciler;
mod track;

#[cfg(feature = "cjconfig")]
mod config_ext;

// Public re-exports
pub use error::{Error, Result};
pub use library::{LibraryEntry, TrackLibrary};
pub use reconciler::{
    LoadDirective, PlaybackSession, PlaybackState, Reconciler, ReconcilerEvent, ReconcilerOptions,
    RotationPolicy,
};
pub use track::{Track, TrackOrigin};

#[cfg(feature = "cjconfig")]
pub use config_ext::LibraryConfigExt;
