//! Configuration for the core crate
//!
//! This module provides configuration options for the core crate,
//! currently the projection engine settings plus logging preferences.

use std::path::Path;
use serde::{Serialize, Deserialize};

use crate::error::CoreError;
use crate::projection::columns::context_column_urns;

/// Projection engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Columns a request for every column expands to
    pub declared_columns: Vec<String>,

    /// Whether result rows arriving out of identity order are an error
    pub enforce_row_order: bool,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        ProjectionConfig {
            declared_columns: context_column_urns(),
            enforce_row_order: true,
        }
    }
}

/// Core configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Projection configuration
    #[serde(default)]
    pub projection: ProjectionConfig,

    /// Log level
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            projection: ProjectionConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl CoreConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let file = std::fs::File::open(path).map_err(CoreError::IoError)?;

        let config: CoreConfig = serde_json::from_reader(file).map_err(CoreError::JsonError)?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CoreError> {
        let file = std::fs::File::create(path).map_err(CoreError::IoError)?;

        serde_json::to_writer_pretty(file, self).map_err(CoreError::JsonError)?;

        Ok(())
    }

    /// Check that every declared column is a known URN
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.projection.declared_columns.is_empty() {
            return Err(CoreError::ConfigError("projection.declared_columns must not be empty".to_string()));
        }
        for urn in &self.projection.declared_columns {
            urn.parse::<crate::projection::ColumnKey>()
                .map_err(|err| CoreError::ConfigError(format!("projection.declared_columns: {}", err)))?;
        }
        Ok(())
    }

    /// Create a development configuration
    pub fn development() -> Self {
        let mut config = Self::default();
        config.log_level = "debug".to_string();
        config
    }

    /// Create a production configuration
    pub fn production() -> Self {
        let mut config = Self::default();
        config.log_level = "info".to_string();
        config.projection.enforce_row_order = true;
        config
    }

    /// Create a testing configuration
    pub fn testing() -> Self {
        let mut config = Self::default();
        config.log_level = "debug".to_string();
        config.projection.enforce_row_order = false;
        config
    }
}
