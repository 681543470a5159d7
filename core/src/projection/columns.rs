//! Output column keys
//!
//! Columns are named by URNs. The namespace prefix decides whether a column
//! reads a context field of the meta-row or the value of one prompt.

use std::fmt;
use std::str::FromStr;

use crate::error::{invalid_argument, CoreError, ErrorCode};

/// Prefix of context columns
pub const CONTEXT_PREFIX: &str = "urn:ohmage:context:";

/// Prefix of prompt columns
pub const PROMPT_PREFIX: &str = "urn:ohmage:prompt:id:";

/// Requests every declared column, or every prompt present in the rows
pub const SPECIAL_ALL: &str = "urn:ohmage:special:all";

/// Fixed meta-row fields that can be requested as columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextField {
    /// Login name
    User,
    /// Uploading client
    Client,
    /// Local timestamp
    Timestamp,
    /// Time zone of the timestamp
    Timezone,
    /// Timestamp converted to UTC
    UtcTimestamp,
    /// Survey launch context
    SurveyLaunchContext,
    /// Location status
    LocationStatus,
    /// Location latitude
    LocationLatitude,
    /// Location longitude
    LocationLongitude,
    /// Time of the location fix
    LocationTimestamp,
    /// Location accuracy
    LocationAccuracy,
    /// Location provider
    LocationProvider,
    /// Campaign name from the request
    CampaignName,
    /// Campaign version from the request
    CampaignVersion,
    /// Repeatable set id
    RepeatableSetId,
    /// Repeatable set iteration
    RepeatableSetIteration,
}

impl ContextField {
    /// Every context field in declaration order
    pub const ALL: [ContextField; 16] = [
        ContextField::User,
        ContextField::Client,
        ContextField::Timestamp,
        ContextField::Timezone,
        ContextField::UtcTimestamp,
        ContextField::SurveyLaunchContext,
        ContextField::LocationStatus,
        ContextField::LocationLatitude,
        ContextField::LocationLongitude,
        ContextField::LocationTimestamp,
        ContextField::LocationAccuracy,
        ContextField::LocationProvider,
        ContextField::CampaignName,
        ContextField::CampaignVersion,
        ContextField::RepeatableSetId,
        ContextField::RepeatableSetIteration,
    ];

    /// URN suffix after [`CONTEXT_PREFIX`]
    pub fn suffix(&self) -> &'static str {
        match self {
            ContextField::User => "user",
            ContextField::Client => "client",
            ContextField::Timestamp => "timestamp",
            ContextField::Timezone => "timezone",
            ContextField::UtcTimestamp => "utc_timestamp",
            ContextField::SurveyLaunchContext => "survey_launch_context",
            ContextField::LocationStatus => "location:status",
            ContextField::LocationLatitude => "location:latitude",
            ContextField::LocationLongitude => "location:longitude",
            ContextField::LocationTimestamp => "location:timestamp",
            ContextField::LocationAccuracy => "location:accuracy",
            ContextField::LocationProvider => "location:provider",
            ContextField::CampaignName => "campaign:name",
            ContextField::CampaignVersion => "campaign:version",
            ContextField::RepeatableSetId => "repeatable_set:id",
            ContextField::RepeatableSetIteration => "repeatable_set:iteration",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        ContextField::ALL.iter().copied().find(|field| field.suffix() == suffix)
    }
}

/// A resolved output column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnKey {
    /// A meta-row context field
    Context(ContextField),

    /// The value of one prompt
    Prompt(String),
}

impl ColumnKey {
    /// Column for a prompt id, with or without its URN prefix
    pub fn prompt(id: &str) -> Self {
        ColumnKey::Prompt(id.strip_prefix(PROMPT_PREFIX).unwrap_or(id).to_string())
    }

    /// Full URN of the column
    pub fn urn(&self) -> String {
        match self {
            ColumnKey::Context(field) => format!("{}{}", CONTEXT_PREFIX, field.suffix()),
            ColumnKey::Prompt(id) => format!("{}{}", PROMPT_PREFIX, id),
        }
    }
}

impl FromStr for ColumnKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let urn = s.trim();
        if let Some(suffix) = urn.strip_prefix(CONTEXT_PREFIX) {
            if let Some(field) = ContextField::from_suffix(suffix) {
                return Ok(ColumnKey::Context(field));
            }
        } else if let Some(id) = urn.strip_prefix(PROMPT_PREFIX) {
            if !id.is_empty() {
                return Ok(ColumnKey::Prompt(id.to_string()));
            }
        }
        Err(invalid_argument(
            ErrorCode::SurveyInvalidColumn,
            format!("The column is unknown: {}", s),
        ))
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.urn())
    }
}

/// URNs of every context column
pub fn context_column_urns() -> Vec<String> {
    ContextField::ALL
        .iter()
        .map(|field| ColumnKey::Context(*field).urn())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("urn:ohmage:context:user", ColumnKey::Context(ContextField::User))]
    #[case("urn:ohmage:context:location:accuracy", ColumnKey::Context(ContextField::LocationAccuracy))]
    #[case("urn:ohmage:context:repeatable_set:iteration", ColumnKey::Context(ContextField::RepeatableSetIteration))]
    #[case("urn:ohmage:prompt:id:sleepHours", ColumnKey::Prompt("sleepHours".to_string()))]
    fn test_parse_column(#[case] urn: &str, #[case] expected: ColumnKey) {
        let key: ColumnKey = urn.parse().unwrap();
        assert_eq!(key, expected);
        assert_eq!(key.urn(), urn);
    }

    #[rstest]
    #[case("urn:ohmage:context:mood")]
    #[case("urn:ohmage:prompt:id:")]
    #[case("urn:awm:context:user")]
    #[case(SPECIAL_ALL)]
    fn test_reject_unknown_column(#[case] urn: &str) {
        let err = urn.parse::<ColumnKey>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::SurveyInvalidColumn);
    }

    #[test]
    fn test_prompt_helper_strips_prefix() {
        assert_eq!(ColumnKey::prompt("urn:ohmage:prompt:id:q1"), ColumnKey::prompt("q1"));
        assert_eq!(ColumnKey::prompt("q1").urn(), "urn:ohmage:prompt:id:q1");
        assert_ne!(ColumnKey::prompt("q1"), ColumnKey::Context(ContextField::Client));
    }

    #[test]
    fn test_context_column_urns() {
        let urns = context_column_urns();
        assert_eq!(urns.len(), ContextField::ALL.len());
        assert_eq!(urns[0], "urn:ohmage:context:user");
        assert!(urns.iter().all(|urn| urn.parse::<ColumnKey>().is_ok()));
    }
}
