//! Index configuration.
//!
//! Deserializable from JSON (and TOML with the `toml` feature) so a deployment
//! can tune the tree without recompiling.

use crate::error::{CityQueryError, Result};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Configuration shared by the builder and both indexes.
///
/// # Example
///
/// ```rust
/// use cityquery::Config;
///
/// let config = Config::from_json_str(r#"{ "max_node_entries": 32 }"#).unwrap();
/// assert_eq!(config.max_node_entries, 32);
/// assert_eq!(config.min_node_entries, 6);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Radius of the sphere records are projected onto, in kilometres
    #[serde(default = "Config::default_sphere_radius_km")]
    pub sphere_radius_km: f64,

    /// Maximum fan-out of an R-tree node
    #[serde(default = "Config::default_max_node_entries")]
    pub max_node_entries: usize,

    /// Minimum fill of every non-root R-tree node
    #[serde(default = "Config::default_min_node_entries")]
    pub min_node_entries: usize,

    /// Fail queries that hit identifiers missing from the record store
    /// instead of skipping them with a warning.
    #[serde(default)]
    pub strict_hydration: bool,
}

impl Config {
    const fn default_sphere_radius_km() -> f64 {
        EARTH_RADIUS_KM
    }

    const fn default_max_node_entries() -> usize {
        16
    }

    const fn default_min_node_entries() -> usize {
        6
    }

    pub fn with_sphere_radius_km(mut self, radius: f64) -> Self {
        self.sphere_radius_km = radius;
        self
    }

    /// Set both node capacity bounds at once.
    pub fn with_node_capacity(mut self, min_entries: usize, max_entries: usize) -> Self {
        self.min_node_entries = min_entries;
        self.max_node_entries = max_entries;
        self
    }

    pub fn with_strict_hydration(mut self, strict: bool) -> Self {
        self.strict_hydration = strict;
        self
    }

    /// Check the values are usable by the indexes.
    pub fn validate(&self) -> Result<()> {
        if !self.sphere_radius_km.is_finite() || self.sphere_radius_km <= 0.0 {
            return Err(CityQueryError::InvalidInput(format!(
                "Sphere radius must be finite and positive, got: {}",
                self.sphere_radius_km
            )));
        }

        if self.max_node_entries < 4 {
            return Err(CityQueryError::InvalidInput(format!(
                "max_node_entries must be at least 4, got: {}",
                self.max_node_entries
            )));
        }

        if self.min_node_entries < 2 || self.min_node_entries > self.max_node_entries / 2 {
            return Err(CityQueryError::InvalidInput(format!(
                "min_node_entries must be in [2, {}], got: {}",
                self.max_node_entries / 2,
                self.min_node_entries
            )));
        }

        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML configuration. Missing fields take defaults.
    #[cfg(feature = "toml")]
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sphere_radius_km: Self::default_sphere_radius_km(),
            max_node_entries: Self::default_max_node_entries(),
            min_node_entries: Self::default_min_node_entries(),
            strict_hydration: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sphere_radius_km, EARTH_RADIUS_KM);
        assert!(!config.strict_hydration);
    }

    #[test]
    fn test_json_defaults() {
        let config = Config::from_json_str("{}").unwrap();
        assert_eq!(config, Config::default());

        let config = Config::from_json_str(
            r#"{ "sphere_radius_km": 1.0, "strict_hydration": true }"#,
        )
        .unwrap();
        assert_eq!(config.sphere_radius_km, 1.0);
        assert!(config.strict_hydration);
        assert_eq!(config.max_node_entries, 16);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::default().with_sphere_radius_km(0.0).validate().is_err());
        assert!(
            Config::default()
                .with_sphere_radius_km(f64::NAN)
                .validate()
                .is_err()
        );
        assert!(Config::default().with_node_capacity(2, 3).validate().is_err());
        assert!(Config::default().with_node_capacity(1, 8).validate().is_err());
        assert!(Config::default().with_node_capacity(5, 8).validate().is_err());
        assert!(Config::default().with_node_capacity(2, 4).validate().is_ok());
        assert!(Config::from_json_str(r#"{ "max_node_entries": 2 }"#).is_err());
    }

    #[test]
    fn test_malformed_json() {
        let err = Config::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, CityQueryError::Serialization(_)));
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_toml_config() {
        let config = Config::from_toml_str("max_node_entries = 8\nmin_node_entries = 3\n").unwrap();
        assert_eq!(config.max_node_entries, 8);
        assert_eq!(config.min_node_entries, 3);
    }
}
