//! Store contract and wire types shared by the server and the remote
//! client.

use crate::error::Result;
use async_trait::async_trait;
use cjqueue::Track;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;

/// A submission as received from the form, before the store assigns
/// identity and arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubmission {
    pub location_id: String,
    pub media_ref: String,
    /// Submitter name; becomes the submitted track's display title.
    pub submitted_by: String,
}

/// Body of `POST /api/submit`, in the field names of the public form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub location: String,
    #[serde(rename = "youtubeLink")]
    pub youtube_link: String,
    pub name: String,
}

impl SubmitRequest {
    /// Converts the wire shape into a store submission.
    pub fn into_submission(self) -> NewSubmission {
        NewSubmission {
            location_id: self.location,
            media_ref: self.youtube_link,
            submitted_by: self.name,
        }
    }
}

/// Body of a successful `POST /api/submit` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub message: String,
    pub track: Track,
}

/// Persistence contract for patron submissions.
///
/// Submitted tracks are append-only; the only mutation is [`clear`]. The
/// duplicate check at insert time compares against the location's most
/// recent submission only.
///
/// [`clear`]: SubmissionStore::clear
#[async_trait]
pub trait SubmissionStore: Debug + Send + Sync {
    /// Persists a submission, assigning a unique id and the arrival
    /// timestamp used as queue ordering key.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateSubmission`] when the media ref equals the
    ///   location's most recent submission
    /// - [`Error::InvalidLocation`] for an unknown location
    ///
    /// [`Error::DuplicateSubmission`]: crate::Error::DuplicateSubmission
    /// [`Error::InvalidLocation`]: crate::Error::InvalidLocation
    async fn insert(&self, submission: NewSubmission) -> Result<Track>;

    /// The newest submission currently stored for the location, if any.
    async fn fetch_latest(&self, location_id: &str) -> Result<Option<Track>>;

    /// Submissions whose arrival time falls within the given window,
    /// newest first.
    async fn recent(&self, location_id: &str, within: Duration) -> Result<Vec<Track>>;

    /// Removes every submission for the location, returning how many were
    /// dropped.
    async fn clear(&self, location_id: &str) -> Result<u64>;
}
