//! Per-session dedup of submission store polls.
//!
//! The store only answers "what is the newest submission for this
//! location"; turning repeated answers into discrete *new track* events is
//! the poller's job. The last-delivered id is instance state, created and
//! dropped with the session, never a process-wide singleton, so delivery
//! is best-effort: a restarted session will surface the current store head
//! once more.

use cjqueue::Track;

/// Result of classifying one poll.
#[derive(Debug)]
pub enum PollOutcome {
    /// A submission this poller has not delivered before.
    NewTrack(Track),
    /// Unchanged since the last successful poll, or the store is empty.
    NoChange,
    /// The poll itself failed; retried on the next tick, never fatal.
    Failed(cjstore::Error),
}

/// Per-session poll classifier.
#[derive(Debug)]
pub struct Poller {
    location_id: String,
    last_delivered: Option<String>,
}

impl Poller {
    pub fn new(location_id: impl Into<String>) -> Self {
        Self {
            location_id: location_id.into(),
            last_delivered: None,
        }
    }

    /// Id of the most recently delivered track, if any.
    pub fn last_delivered(&self) -> Option<&str> {
        self.last_delivered.as_deref()
    }

    /// Classifies a fetch result, surfacing a given track id at most once.
    pub fn classify(&mut self, fetched: cjstore::Result<Option<Track>>) -> PollOutcome {
        match fetched {
            Ok(Some(track)) => {
                // A store answer for another location is never delivered.
                if track.location_id != self.location_id {
                    return PollOutcome::NoChange;
                }
                if self.last_delivered.as_deref() == Some(track.id.as_str()) {
                    return PollOutcome::NoChange;
                }
                self.last_delivered = Some(track.id.clone());
                PollOutcome::NewTrack(track)
            }
            Ok(None) => PollOutcome::NoChange,
            Err(err) => PollOutcome::Failed(err),
        }
    }
}
