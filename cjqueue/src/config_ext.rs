//! Configuration extension for the track library.
//!
//! The `library` section of the CrowdJuke configuration lists the fallback
//! tracks every location draws from when its submission queue is empty.

use crate::error::{Error, Result};
use crate::library::{LibraryEntry, TrackLibrary};
use cjconfig::Config;

/// Extension trait exposing the configured fallback library.
pub trait LibraryConfigExt {
    /// Reads the `library` section as raw entries.
    fn get_library_entries(&self) -> Result<Vec<LibraryEntry>>;

    /// Builds the immutable track library from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyLibrary`] when the section is empty; every
    /// location needs filler content to fall back to.
    fn get_track_library(&self) -> Result<TrackLibrary>;
}

impl LibraryConfigExt for Config {
    fn get_library_entries(&self) -> Result<Vec<LibraryEntry>> {
        let value = self
            .get_value(&["library"])
            .map_err(|err| Error::other(err.to_string()))?;
        serde_yaml::from_value(value)
            .map_err(|err| Error::other(format!("invalid library configuration: {err}")))
    }

    fn get_track_library(&self) -> Result<TrackLibrary> {
        TrackLibrary::new(self.get_library_entries()?)
    }
}
