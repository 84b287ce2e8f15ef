//! Fallback track library and random selection.

use crate::error::{Error, Result};
use crate::track::{Track, TrackOrigin};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One entry of the fallback library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub id: String,
    pub title: String,
    pub media_ref: String,
}

impl LibraryEntry {
    /// Materialises the entry as a playable track for a location.
    ///
    /// Library tracks carry no arrival timestamp; they are ordered only by
    /// random selection.
    pub fn to_track(&self, location_id: &str) -> Track {
        Track {
            id: self.id.clone(),
            origin: TrackOrigin::Library,
            media_ref: self.media_ref.clone(),
            title: self.title.clone(),
            location_id: location_id.to_string(),
            submitted_at: None,
            submitted_by: None,
        }
    }
}

/// Immutable ordered collection of fallback tracks.
///
/// Shared read-only between sessions (`Arc<TrackLibrary>`). Selection is a
/// pure function; the caller records the returned id as the new
/// `last_library_track_id` to avoid immediate repeats.
#[derive(Debug, Clone)]
pub struct TrackLibrary {
    entries: Vec<LibraryEntry>,
}

impl TrackLibrary {
    /// Builds a library from its entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyLibrary`] for an empty entry list; a location
    /// with nothing to fall back to is a configuration error.
    pub fn new(entries: Vec<LibraryEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::EmptyLibrary);
        }
        Ok(Self { entries })
    }

    /// Number of entries (always ≥ 1).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; an empty library cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, in configured order.
    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    /// Looks up an entry by id.
    pub fn get(&self, id: &str) -> Option<&LibraryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Picks the next entry uniformly at random, excluding `last_id` unless
    /// the exclusion would empty the candidate set (a single-entry library
    /// repeats its only track).
    pub fn pick_next<R: Rng + ?Sized>(&self, last_id: Option<&str>, rng: &mut R) -> &LibraryEntry {
        let candidates: Vec<&LibraryEntry> = self
            .entries
            .iter()
            .filter(|entry| Some(entry.id.as_str()) != last_id)
            .collect();

        match candidates.choose(rng) {
            Some(entry) => *entry,
            None => &self.entries[0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn entry(id: &str) -> LibraryEntry {
        LibraryEntry {
            id: id.to_string(),
            title: format!("Track {id}"),
            media_ref: format!("https://youtu.be/{id:0>11}"),
        }
    }

    #[test]
    fn test_empty_library_is_rejected() {
        assert!(matches!(
            TrackLibrary::new(vec![]),
            Err(Error::EmptyLibrary)
        ));
    }

    #[test]
    fn test_pick_next_excludes_last_played() {
        let library = TrackLibrary::new(vec![entry("a"), entry("b")]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let picked = library.pick_next(Some("a"), &mut rng);
            assert_eq!(picked.id, "b");
        }
    }

    #[test]
    fn test_pick_next_uniform_over_candidates() {
        let library = TrackLibrary::new(vec![entry("a"), entry("b"), entry("c")]).unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        let mut seen_b = false;
        let mut seen_c = false;
        for _ in 0..100 {
            match library.pick_next(Some("a"), &mut rng).id.as_str() {
                "b" => seen_b = true,
                "c" => seen_c = true,
                other => panic!("excluded entry picked: {other}"),
            }
        }
        assert!(seen_b && seen_c);
    }

    #[test]
    fn test_single_entry_library_repeats_itself() {
        let library = TrackLibrary::new(vec![entry("only")]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let picked = library.pick_next(Some("only"), &mut rng);
        assert_eq!(picked.id, "only");
    }

    #[test]
    fn test_library_track_has_no_timestamp() {
        let library = TrackLibrary::new(vec![entry("a")]).unwrap();
        let track = library.entries()[0].to_track("dagapur");

        assert_eq!(track.origin, TrackOrigin::Library);
        assert_eq!(track.location_id, "dagapur");
        assert!(track.submitted_at.is_none());
        assert!(track.is_library());
    }
}
