//! Error types for the core crate
//!
//! Every failure the engines can raise is a [`CoreError`]. Client-facing
//! variants carry a machine-readable [`ErrorCode`] together with a message
//! naming the rule or input that failed; server-side variants wrap the cause
//! and never expose it through [`CoreError::client_message`].

use std::fmt;
use std::io;
use thiserror::Error;

/// Machine-readable error codes reported alongside client errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The requester lacks the campaign role a rule requires
    CampaignInsufficientPermissions,

    /// The campaign id is missing, malformed or unknown
    CampaignInvalidId,

    /// A campaign role could not be parsed
    CampaignInvalidRole,

    /// A campaign privacy state could not be parsed
    CampaignInvalidPrivacyState,

    /// A campaign running state could not be parsed
    CampaignInvalidRunningState,

    /// A username is missing, malformed or has the wrong existence
    UserInvalidUsername,

    /// The requester lacks a user-level privilege
    UserInsufficientPermissions,

    /// A user does not belong to the campaign in question
    UserNotInCampaign,

    /// A requested output column is not recognised
    SurveyInvalidColumn,

    /// An embedded location payload is malformed
    SurveyInvalidLocation,

    /// Result rows do not arrive grouped by their identity
    SurveyUnorderedResults,

    /// Credentials were rejected
    AuthenticationFailed,

    /// Catch-all for server-side failures
    ServerGeneralError,
}

impl ErrorCode {
    /// Wire name of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CampaignInsufficientPermissions => "CAMPAIGN_INSUFFICIENT_PERMISSIONS",
            ErrorCode::CampaignInvalidId => "CAMPAIGN_INVALID_ID",
            ErrorCode::CampaignInvalidRole => "CAMPAIGN_INVALID_ROLE",
            ErrorCode::CampaignInvalidPrivacyState => "CAMPAIGN_INVALID_PRIVACY_STATE",
            ErrorCode::CampaignInvalidRunningState => "CAMPAIGN_INVALID_RUNNING_STATE",
            ErrorCode::UserInvalidUsername => "USER_INVALID_USERNAME",
            ErrorCode::UserInsufficientPermissions => "USER_INSUFFICIENT_PERMISSIONS",
            ErrorCode::UserNotInCampaign => "USER_NOT_IN_CAMPAIGN",
            ErrorCode::SurveyInvalidColumn => "SURVEY_INVALID_COLUMN",
            ErrorCode::SurveyInvalidLocation => "SURVEY_INVALID_LOCATION",
            ErrorCode::SurveyUnorderedResults => "SURVEY_UNORDERED_RESULTS",
            ErrorCode::AuthenticationFailed => "AUTHENTICATION_FAILED",
            ErrorCode::ServerGeneralError => "SERVER_GENERAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure raised by a fact provider
#[derive(Error, Debug)]
pub enum DataAccessError {
    /// A query against the backing store failed
    #[error("Query failed: {0}")]
    Query(String),

    /// The backing store could not be reached
    #[error("Data store unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure
    #[error("Backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed or missing input
    #[error("Invalid argument ({code}): {message}")]
    InvalidArgument {
        /// Machine-readable code
        code: ErrorCode,
        /// Human-readable message
        message: String,
    },

    /// A referenced entity does not exist
    #[error("Unknown entity ({code}): {message}")]
    UnknownEntity {
        /// Machine-readable code
        code: ErrorCode,
        /// Human-readable message
        message: String,
    },

    /// Authorization denial, the message names the failed rule
    #[error("Insufficient permissions ({code}): {message}")]
    InsufficientPermissions {
        /// Machine-readable code
        code: ErrorCode,
        /// Human-readable message
        message: String,
    },

    /// Credential mismatch
    #[error("Authentication failure: {0}")]
    AuthenticationFailure(String),

    /// The fact provider failed
    #[error("Data access failure: {0}")]
    DataAccess(#[from] DataAccessError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred.";

impl CoreError {
    /// Machine-readable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::InvalidArgument { code, .. }
            | CoreError::UnknownEntity { code, .. }
            | CoreError::InsufficientPermissions { code, .. } => *code,
            CoreError::AuthenticationFailure(_) => ErrorCode::AuthenticationFailed,
            _ => ErrorCode::ServerGeneralError,
        }
    }

    /// Whether the caller is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidArgument { .. }
                | CoreError::UnknownEntity { .. }
                | CoreError::InsufficientPermissions { .. }
                | CoreError::AuthenticationFailure(_)
        )
    }

    /// Message safe to show to the caller
    pub fn client_message(&self) -> String {
        match self {
            CoreError::InvalidArgument { message, .. }
            | CoreError::UnknownEntity { message, .. }
            | CoreError::InsufficientPermissions { message, .. } => message.clone(),
            CoreError::AuthenticationFailure(message) => message.clone(),
            _ => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Result type for the core crate
pub type Result<T> = std::result::Result<T, CoreError>;

/// Build an InvalidArgument error
pub fn invalid_argument(code: ErrorCode, message: impl Into<String>) -> CoreError {
    CoreError::InvalidArgument { code, message: message.into() }
}

/// Build an UnknownEntity error
pub fn unknown_entity(code: ErrorCode, message: impl Into<String>) -> CoreError {
    CoreError::UnknownEntity { code, message: message.into() }
}

/// Build an InsufficientPermissions error
pub fn insufficient_permissions(code: ErrorCode, message: impl Into<String>) -> CoreError {
    CoreError::InsufficientPermissions { code, message: message.into() }
}

/// Convert a string error to a ConfigError
pub fn to_config_error<E: fmt::Display>(err: E) -> CoreError {
    CoreError::ConfigError(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let core_err: CoreError = io_err.into();
        match core_err {
            CoreError::IoError(_) => {}
            _ => panic!("Expected IoError variant"),
        }

        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let core_err: CoreError = json_err.into();
        match core_err {
            CoreError::JsonError(_) => {}
            _ => panic!("Expected JsonError variant"),
        }

        let core_err: CoreError = DataAccessError::Unavailable("db down".to_string()).into();
        match core_err {
            CoreError::DataAccess(DataAccessError::Unavailable(msg)) => assert_eq!(msg, "db down"),
            _ => panic!("Expected DataAccess variant"),
        }

        match to_config_error("bad value") {
            CoreError::ConfigError(msg) => assert_eq!(msg, "bad value"),
            _ => panic!("Expected ConfigError variant"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = insufficient_permissions(
            ErrorCode::CampaignInsufficientPermissions,
            "The user is not allowed to update the campaign.",
        );
        assert_eq!(
            err.to_string(),
            "Insufficient permissions (CAMPAIGN_INSUFFICIENT_PERMISSIONS): The user is not allowed to update the campaign."
        );

        let err = unknown_entity(ErrorCode::CampaignInvalidId, "The campaign does not exist: c1");
        assert_eq!(err.to_string(), "Unknown entity (CAMPAIGN_INVALID_ID): The campaign does not exist: c1");
    }

    #[test]
    fn test_client_and_server_errors() {
        let denied = insufficient_permissions(ErrorCode::UserInsufficientPermissions, "The user is not an admin.");
        assert!(denied.is_client_error());
        assert_eq!(denied.code(), ErrorCode::UserInsufficientPermissions);
        assert_eq!(denied.client_message(), "The user is not an admin.");

        let failure: CoreError = DataAccessError::Query("SELECT failed on table user_role".to_string()).into();
        assert!(!failure.is_client_error());
        assert_eq!(failure.code(), ErrorCode::ServerGeneralError);
        assert!(!failure.client_message().contains("user_role"));

        let auth = CoreError::AuthenticationFailure("Unknown user or incorrect password.".to_string());
        assert!(auth.is_client_error());
        assert_eq!(auth.code(), ErrorCode::AuthenticationFailed);
    }
}
