//! Track model shared by the library, the submission store and the
//! reconciler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a track came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackOrigin {
    /// Fallback content from the fixed track library.
    Library,
    /// A patron submission persisted by the submission store.
    Submitted,
}

/// One playable item.
///
/// `id`, `origin` and `media_ref` are immutable once created. Ids are unique
/// within their origin only; a library id and a submission id may collide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub origin: TrackOrigin,
    /// Opaque locator of the playable media (a YouTube URL in practice).
    /// May be malformed; the reconciler recovers from unplayable refs.
    pub media_ref: String,
    pub title: String,
    pub location_id: String,
    /// Arrival timestamp, the queue ordering key. Library tracks have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    /// Submitter name (submitted tracks only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<String>,
}

impl Track {
    /// Whether this track is filler content from the library.
    pub fn is_library(&self) -> bool {
        self.origin == TrackOrigin::Library
    }

    /// Ordering key for the pending queue. Only submitted tracks are ever
    /// queued; a missing timestamp sorts first.
    pub(crate) fn queue_key(&self) -> DateTime<Utc> {
        self.submitted_at.unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}
