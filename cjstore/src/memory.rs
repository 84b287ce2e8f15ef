//! In-process submission store backend.

use crate::api::{NewSubmission, SubmissionStore};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use cjqueue::{Track, TrackOrigin};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// In-memory submission store.
///
/// Entries live in a per-location vector in arrival order; the newest
/// submission is the last element. State is process-local and lost on
/// restart.
#[derive(Debug)]
pub struct MemoryStore {
    locations: Vec<String>,
    entries: RwLock<HashMap<String, Vec<Track>>>,
}

impl MemoryStore {
    /// Creates a store accepting submissions for the given locations.
    pub fn new<I, S>(locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            locations: locations.into_iter().map(Into::into).collect(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Known location ids.
    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    fn is_known(&self, location_id: &str) -> bool {
        self.locations.iter().any(|known| known == location_id)
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn insert(&self, submission: NewSubmission) -> Result<Track> {
        if !self.is_known(&submission.location_id) {
            return Err(Error::InvalidLocation(submission.location_id));
        }

        let mut entries = self.entries.write().await;
        let list = entries.entry(submission.location_id.clone()).or_default();

        // Only the most recent submission is compared; a media ref deeper in
        // the backlog is accepted again.
        if let Some(last) = list.last() {
            if last.media_ref == submission.media_ref {
                return Err(Error::DuplicateSubmission);
            }
        }

        let track = Track {
            id: Uuid::new_v4().to_string(),
            origin: TrackOrigin::Submitted,
            media_ref: submission.media_ref,
            title: submission.submitted_by.clone(),
            location_id: submission.location_id,
            submitted_at: Some(Utc::now()),
            submitted_by: Some(submission.submitted_by),
        };

        debug!(
            location = %track.location_id,
            track = %track.id,
            "Stored submission"
        );
        list.push(track.clone());
        Ok(track)
    }

    async fn fetch_latest(&self, location_id: &str) -> Result<Option<Track>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(location_id)
            .and_then(|list| list.last())
            .cloned())
    }

    async fn recent(&self, location_id: &str, within: Duration) -> Result<Vec<Track>> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(within)
                .map_err(|err| Error::other(format!("invalid window: {err}")))?;

        let entries = self.entries.read().await;
        let mut tracks: Vec<Track> = entries
            .get(location_id)
            .map(|list| {
                list.iter()
                    .filter(|track| track.submitted_at.map(|at| at >= cutoff).unwrap_or(false))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        tracks.reverse(); // newest first
        Ok(tracks)
    }

    async fn clear(&self, location_id: &str) -> Result<u64> {
        let mut entries = self.entries.write().await;
        let dropped = entries
            .remove(location_id)
            .map(|list| list.len() as u64)
            .unwrap_or(0);

        debug!(location = %location_id, dropped, "Cleared submissions");
        Ok(dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(location: &str, media: &str, name: &str) -> NewSubmission {
        NewSubmission {
            location_id: location.to_string(),
            media_ref: media.to_string(),
            submitted_by: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_identity_and_order() {
        let store = MemoryStore::new(["dagapur"]);

        let first = store
            .insert(submission("dagapur", "https://youtu.be/aaaaaaaaaaa", "Asha"))
            .await
            .unwrap();
        let second = store
            .insert(submission("dagapur", "https://youtu.be/bbbbbbbbbbb", "Ravi"))
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.origin, TrackOrigin::Submitted);
        assert!(first.submitted_at.unwrap() <= second.submitted_at.unwrap());

        let latest = store.fetch_latest("dagapur").await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
    }

    #[tokio::test]
    async fn test_back_to_back_duplicate_is_rejected() {
        let store = MemoryStore::new(["dagapur"]);
        let media = "https://youtu.be/aaaaaaaaaaa";

        store
            .insert(submission("dagapur", media, "Asha"))
            .await
            .unwrap();
        let duplicate = store.insert(submission("dagapur", media, "Ravi")).await;

        assert!(matches!(duplicate, Err(Error::DuplicateSubmission)));
    }

    #[tokio::test]
    async fn test_only_most_recent_submission_is_compared() {
        let store = MemoryStore::new(["dagapur"]);
        let media = "https://youtu.be/aaaaaaaaaaa";

        store
            .insert(submission("dagapur", media, "Asha"))
            .await
            .unwrap();
        store
            .insert(submission("dagapur", "https://youtu.be/bbbbbbbbbbb", "Ravi"))
            .await
            .unwrap();

        // Same media as an *older* entry: accepted by design.
        let resubmitted = store.insert(submission("dagapur", media, "Mira")).await;
        assert!(resubmitted.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_check_is_per_location() {
        let store = MemoryStore::new(["dagapur", "sevoke"]);
        let media = "https://youtu.be/aaaaaaaaaaa";

        store
            .insert(submission("dagapur", media, "Asha"))
            .await
            .unwrap();
        let other_location = store.insert(submission("sevoke", media, "Asha")).await;
        assert!(other_location.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_location_is_rejected() {
        let store = MemoryStore::new(["dagapur"]);

        let result = store
            .insert(submission("nowhere", "https://youtu.be/aaaaaaaaaaa", "X"))
            .await;
        assert!(matches!(result, Err(Error::InvalidLocation(loc)) if loc == "nowhere"));

        // Reads on unknown locations are just empty.
        assert!(store.fetch_latest("nowhere").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recent_is_newest_first() {
        let store = MemoryStore::new(["dagapur"]);

        store
            .insert(submission("dagapur", "https://youtu.be/aaaaaaaaaaa", "A"))
            .await
            .unwrap();
        store
            .insert(submission("dagapur", "https://youtu.be/bbbbbbbbbbb", "B"))
            .await
            .unwrap();

        let recent = store
            .recent("dagapur", Duration::from_secs(24 * 3600))
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].submitted_by.as_deref(), Some("B"));
        assert_eq!(recent[1].submitted_by.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_recent_window_excludes_old_entries() {
        let store = MemoryStore::new(["dagapur"]);

        store
            .insert(submission("dagapur", "https://youtu.be/aaaaaaaaaaa", "A"))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let none = store
            .recent("dagapur", Duration::from_millis(1))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_clear_drops_everything_for_a_location() {
        let store = MemoryStore::new(["dagapur", "sevoke"]);

        store
            .insert(submission("dagapur", "https://youtu.be/aaaaaaaaaaa", "A"))
            .await
            .unwrap();
        store
            .insert(submission("sevoke", "https://youtu.be/bbbbbbbbbbb", "B"))
            .await
            .unwrap();

        assert_eq!(store.clear("dagapur").await.unwrap(), 1);
        assert!(store.fetch_latest("dagapur").await.unwrap().is_none());

        // Other locations are untouched.
        assert!(store.fetch_latest("sevoke").await.unwrap().is_some());
    }
}
