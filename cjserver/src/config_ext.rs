//! Configuration extension for the server.
//!
//! The `locations` section of the CrowdJuke configuration declares the
//! venue registry: geofence, display poll period, optional rotation and the
//! login credentials of each venue.

use crate::locations::{Location, LocationRegistry};
use anyhow::{Context, Result};
use cjconfig::Config;

/// Extension trait exposing the configured venue registry.
pub trait ServerConfigExt {
    /// Reads the `locations` section as raw venue entries.
    fn get_locations(&self) -> Result<Vec<Location>>;

    /// Builds the read-only registry from configuration.
    fn get_location_registry(&self) -> Result<LocationRegistry>;
}

impl ServerConfigExt for Config {
    fn get_locations(&self) -> Result<Vec<Location>> {
        let value = self.get_value(&["locations"])?;
        serde_yaml::from_value(value).context("invalid locations configuration")
    }

    fn get_location_registry(&self) -> Result<LocationRegistry> {
        Ok(LocationRegistry::new(self.get_locations()?))
    }
}
