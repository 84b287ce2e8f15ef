//! # cjsession - per-location display session runtime
//!
//! A *display session* is the live counterpart of one venue's display page:
//! it polls the submission store, drives the queue reconciler, and tells the
//! playback surface what to load. This crate provides:
//!
//! - [`Poller`]: per-session dedup of store polls (a submission is surfaced
//!   at most once per session; state dies with the session)
//! - [`SessionHandle`]: the command surface of a running session (player
//!   events, skip, reset, snapshots, shutdown)
//! - [`SessionManager`]: registry of live sessions, one per location
//! - [`PlaybackSurface`]: seam towards the embeddable media player
//!
//! # Concurrency model
//!
//! Each session runs a single worker task. The poll timer, the rotation
//! countdown and every externally delivered event funnel into that task's
//! command queue, so reconciler transitions are applied strictly one at a
//! time. Poll I/O is spawned off the worker and reports back through the
//! same queue, so a slow store never blocks player-event processing, and at
//! most one poll per location is in flight.
//!
//! Shutting a session down (or dropping its manager entry) stops the worker
//! and with it every timer the session owned.

mod error;
mod manager;
mod poller;
mod surface;
mod worker;

// Public re-exports
pub use error::{Error, Result};
pub use manager::SessionManager;
pub use poller::{PollOutcome, Poller};
pub use surface::{LoggingSurface, PlaybackSurface, PlayerEvent};
pub use worker::{SessionConfig, SessionHandle, SessionSnapshot, SessionUpdate};
