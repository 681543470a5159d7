//! Configuration for the report front end
//!
//! Wraps the core configuration and adds where the facts snapshot lives.
//! Every field can be overridden from the command line or the environment.

use std::path::{Path, PathBuf};
use ohmage_core::CoreConfig;
use serde::{Serialize, Deserialize};

use crate::error::{ReportError, Result};

/// Report front end configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Engine configuration
    #[serde(default)]
    pub core: CoreConfig,

    /// JSON snapshot of users, classes and campaigns
    #[serde(default)]
    pub facts_path: Option<PathBuf>,
}

impl ReportConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let config: ReportConfig = serde_json::from_reader(file)?;
        config.core.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Path of the facts snapshot, required by every command
    pub fn facts_path(&self) -> Result<&Path> {
        self.facts_path
            .as_deref()
            .ok_or_else(|| ReportError::Config("no facts snapshot configured".to_string()))
    }

    /// Create a configuration for local development
    pub fn for_development() -> Self {
        Self {
            core: CoreConfig::development(),
            ..Default::default()
        }
    }

    /// Create a configuration for production
    pub fn for_production() -> Self {
        Self {
            core: CoreConfig::production(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_round_trip_through_file() {
        let mut config = ReportConfig::for_development();
        config.facts_path = Some(PathBuf::from("/var/lib/ohmage/facts.json"));

        let file = NamedTempFile::new().unwrap();
        config.to_file(file.path()).unwrap();
        assert_eq!(ReportConfig::from_file(file.path()).unwrap(), config);
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "facts_path": "facts.json" }}"#).unwrap();

        let config = ReportConfig::from_file(file.path()).unwrap();
        assert_eq!(config.core, CoreConfig::default());
        assert_eq!(config.facts_path().unwrap(), Path::new("facts.json"));
    }

    #[test]
    fn test_missing_facts_path() {
        let config = ReportConfig::for_production();
        assert!(matches!(config.facts_path(), Err(ReportError::Config(_))));
        assert!(config.core.projection.enforce_row_order);
    }

    #[test]
    fn test_invalid_core_section() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "core": {{ "projection": {{ "declared_columns": [], "enforce_row_order": true }}, "log_level": "info" }} }}"#
        )
        .unwrap();

        assert!(matches!(
            ReportConfig::from_file(file.path()),
            Err(ReportError::Core(ohmage_core::CoreError::ConfigError(_)))
        ));
    }
}
