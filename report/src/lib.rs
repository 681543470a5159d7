//! ohmage report front end
//!
//! Loads a facts snapshot and answers authorization checks, campaign
//! listings and survey response reports from the command line.

// Error types and result
pub mod error;
pub use error::{ReportError, Result};

// Configuration
pub mod config;
pub use config::ReportConfig;

// Request-scoped command handlers
pub mod commands;
pub use commands::Report;
