//! Configuration loading from mirrormap.toml.
//!
//! ## Example
//!
//! ```toml
//! target-instance-count = 20
//! rare-boost-factor = 5.0
//! missing-type-threshold = 0.5
//! supplemental-budget-fraction = 0.10
//! ```
//!
//! File values layer over [`SelectorConfig::default`]; anything not set
//! keeps its default. Loaded configs are range-validated immediately - a
//! bad value in the file is a fatal configuration error, not something to
//! discover halfway through a selection run.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SelectorError};
use crate::types::SelectorConfig;

/// Config file name searched for next to the snapshot.
pub const CONFIG_FILE_NAME: &str = "mirrormap.toml";

/// Raw config as deserialized from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    target_instance_count: Option<usize>,
    rare_boost_factor: Option<f64>,
    missing_type_threshold: Option<f64>,
    supplemental_budget_fraction: Option<f64>,
    structural_blend: Option<f64>,
    boost_missing: Option<f64>,
    boost_underrepresented: Option<f64>,
    boost_covered: Option<f64>,
}

impl RawConfig {
    fn apply(self, mut config: SelectorConfig) -> SelectorConfig {
        if let Some(v) = self.target_instance_count {
            config.target_instance_count = v;
        }
        if let Some(v) = self.rare_boost_factor {
            config.rare_boost_factor = v;
        }
        if let Some(v) = self.missing_type_threshold {
            config.missing_type_threshold = v;
        }
        if let Some(v) = self.supplemental_budget_fraction {
            config.supplemental_budget_fraction = v;
        }
        if let Some(v) = self.structural_blend {
            config.structural_blend = v;
        }
        if let Some(v) = self.boost_missing {
            config.boost_missing = v;
        }
        if let Some(v) = self.boost_underrepresented {
            config.boost_underrepresented = v;
        }
        if let Some(v) = self.boost_covered {
            config.boost_covered = v;
        }
        config
    }
}

/// Load and validate a config file.
pub fn load_file(path: &Path) -> Result<SelectorConfig> {
    let content = std::fs::read_to_string(path)?;
    from_toml_str(&content)
}

/// Parse and validate TOML config content.
pub fn from_toml_str(content: &str) -> Result<SelectorConfig> {
    let raw: RawConfig =
        toml::from_str(content).map_err(|e| SelectorError::Config(e.to_string()))?;
    let config = raw.apply(SelectorConfig::default());
    config.validate()?;
    Ok(config)
}

/// Look for `mirrormap.toml` in the given directory.
///
/// Returns `Ok(None)` when no file exists; a file that exists but fails to
/// parse or validate is an error, not a silent fallback to defaults.
pub fn discover(directory: &Path) -> Result<Option<SelectorConfig>> {
    let path = directory.join(CONFIG_FILE_NAME);
    if path.exists() {
        load_file(&path).map(Some)
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_values_layer_over_defaults() {
        let config = from_toml_str(
            "target-instance-count = 20\nrare-boost-factor = 5.0\n",
        )
        .unwrap();
        assert_eq!(config.target_instance_count, 20);
        assert_eq!(config.rare_boost_factor, 5.0);
        // Untouched values keep their defaults
        assert_eq!(config.missing_type_threshold, 0.5);
        assert_eq!(config.supplemental_budget_fraction, 0.10);
    }

    #[test]
    fn test_empty_file_is_defaults() {
        let config = from_toml_str("").unwrap();
        assert_eq!(config.target_instance_count, 50);
    }

    #[test]
    fn test_out_of_range_value_is_fatal() {
        assert!(from_toml_str("rare-boost-factor = 0.2\n").is_err());
        assert!(from_toml_str("missing-type-threshold = 2.0\n").is_err());
        assert!(from_toml_str("supplemental-budget-fraction = 1.0\n").is_err());
    }

    #[test]
    fn test_unknown_key_is_fatal() {
        assert!(from_toml_str("target-instance-cuont = 20\n").is_err());
    }

    #[test]
    fn test_malformed_toml_is_fatal() {
        assert!(from_toml_str("target-instance-count = =\n").is_err());
    }

    #[test]
    fn test_discover_finds_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "target-instance-count = 7").unwrap();

        let config = discover(dir.path()).unwrap().unwrap();
        assert_eq!(config.target_instance_count, 7);
    }

    #[test]
    fn test_discover_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(dir.path()).unwrap().is_none());
    }
}
