//! Error types for the report front end

use std::io;
use ohmage_core::error::CoreError;
use serde_json::{json, Value};
use thiserror::Error;

/// Result type for the report front end
pub type Result<T> = std::result::Result<T, ReportError>;

/// Error type for the report front end
#[derive(Debug, Error)]
pub enum ReportError {
    /// Failure raised by one of the engines
    #[error(transparent)]
    Core(#[from] CoreError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed command-line input
    #[error("Invalid input: {0}")]
    Input(String),
}

impl ReportError {
    /// Whether the caller is at fault
    pub fn is_client_error(&self) -> bool {
        match self {
            ReportError::Core(err) => err.is_client_error(),
            ReportError::Input(_) => true,
            _ => false,
        }
    }
}

/// Helper function to convert string errors to an input error
pub fn to_input_error<E: ToString>(err: E) -> ReportError {
    ReportError::Input(err.to_string())
}

/// Render a failure in the read API shape
pub fn to_failure_body(error: &ReportError) -> Value {
    let (code, text) = match error {
        ReportError::Core(err) => (err.code().to_string(), err.client_message()),
        ReportError::Input(msg) => ("INVALID_INPUT".to_string(), msg.clone()),
        _ => ("SERVER_GENERAL_ERROR".to_string(), "An internal error occurred.".to_string()),
    };
    json!({
        "result": "failure",
        "errors": [{ "code": code, "text": text }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ohmage_core::error::{insufficient_permissions, DataAccessError, ErrorCode};

    #[test]
    fn test_denial_body() {
        let error: ReportError = insufficient_permissions(
            ErrorCode::CampaignInsufficientPermissions,
            "The user does not have sufficient permissions to delete the campaign.",
        )
        .into();

        assert!(error.is_client_error());
        let body = to_failure_body(&error);
        assert_eq!(body["result"], "failure");
        assert_eq!(body["errors"][0]["code"], "CAMPAIGN_INSUFFICIENT_PERMISSIONS");
        assert!(body["errors"][0]["text"].as_str().unwrap().contains("delete"));
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let error: ReportError = CoreError::from(DataAccessError::Unavailable("db01 refused".to_string())).into();
        assert!(!error.is_client_error());

        let body = to_failure_body(&error);
        assert_eq!(body["errors"][0]["code"], "SERVER_GENERAL_ERROR");
        assert!(!body.to_string().contains("db01"));

        let io: ReportError = io::Error::new(io::ErrorKind::NotFound, "/srv/facts.json").into();
        assert!(!to_failure_body(&io).to_string().contains("/srv"));
    }

    #[test]
    fn test_input_error() {
        let error = to_input_error("unknown operation: launch");
        assert!(error.is_client_error());
        assert_eq!(to_failure_body(&error)["errors"][0]["code"], "INVALID_INPUT");
    }
}
