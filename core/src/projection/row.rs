//! Flat survey response rows
//!
//! One [`ResultRow`] per answered prompt, as returned by the query layer.

use chrono::{NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::error::{invalid_argument, ErrorCode, Result};

/// Location status meaning no fix was recorded
pub const LOCATION_UNAVAILABLE: &str = "unavailable";

const LOCAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const UTC_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One prompt response with its survey context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Login name of the responding user
    pub login_id: String,

    /// Client application that uploaded the response
    pub client: String,

    /// Survey id within the campaign
    pub survey_id: String,

    /// Prompt id within the survey
    pub prompt_id: String,

    /// Local timestamp, `yyyy-MM-dd HH:mm:ss`
    pub timestamp: String,

    /// Time zone the timestamp was taken in
    pub timezone: String,

    /// Repeatable set the prompt belongs to
    #[serde(default)]
    pub repeatable_set_id: Option<String>,

    /// Iteration of the repeatable set
    #[serde(default)]
    pub repeatable_set_iteration: Option<i64>,

    /// Display form of the response
    #[serde(default)]
    pub display_value: Value,

    /// Prompt label
    #[serde(default)]
    pub display_label: Option<String>,

    /// Prompt type
    #[serde(default)]
    pub prompt_type: Option<String>,

    /// How the response should be displayed
    #[serde(default)]
    pub display_type: Option<String>,

    /// Unit of the response
    #[serde(default)]
    pub unit: Option<String>,

    /// Survey launch context as uploaded
    #[serde(default)]
    pub launch_context: Option<String>,

    /// Location status reported by the client
    #[serde(default)]
    pub location_status: Option<String>,

    /// Location JSON object as uploaded
    #[serde(default)]
    pub location: Option<String>,
}

impl ResultRow {
    /// Flattened location, `None` when no fix was recorded
    pub fn parsed_location(&self) -> Result<Option<Location>> {
        match (self.location_status.as_deref(), self.location.as_deref()) {
            (Some(LOCATION_UNAVAILABLE), _) | (None, _) | (_, None) => Ok(None),
            (Some(_), Some(payload)) => Location::parse(payload).map(Some),
        }
    }

    /// The local timestamp converted to UTC
    pub fn utc_timestamp(&self) -> Option<String> {
        let local = NaiveDateTime::parse_from_str(self.timestamp.trim(), LOCAL_TIMESTAMP_FORMAT).ok()?;
        let zone: Tz = self.timezone.trim().parse().ok()?;
        let zoned = zone.from_local_datetime(&local).earliest()?;
        Some(zoned.with_timezone(&Utc).format(UTC_TIMESTAMP_FORMAT).to_string())
    }
}

/// Location fix flattened from its JSON payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    /// Accuracy in meters
    pub accuracy: Option<f64>,

    /// Latitude
    pub latitude: Option<f64>,

    /// Longitude
    pub longitude: Option<f64>,

    /// Fix provider, e.g. GPS or network
    pub provider: Option<String>,

    /// Time of the fix
    pub timestamp: Option<String>,
}

impl Location {
    /// Parse a location JSON object
    ///
    /// Missing or non-numeric coordinates and empty strings become absent.
    pub fn parse(payload: &str) -> Result<Location> {
        let value: Value = serde_json::from_str(payload).map_err(|err| {
            invalid_argument(ErrorCode::SurveyInvalidLocation, format!("The location is not valid JSON: {}", err))
        })?;
        let object = value.as_object().ok_or_else(|| {
            invalid_argument(ErrorCode::SurveyInvalidLocation, "The location is not a JSON object.")
        })?;

        let number = |key: &str| {
            let parsed = match object.get(key) {
                Some(Value::Number(n)) => n.as_f64(),
                Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            parsed.filter(|n| n.is_finite())
        };

        let text = |key: &str| match object.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        Ok(Location {
            accuracy: number("accuracy"),
            latitude: number("latitude"),
            longitude: number("longitude"),
            provider: text("provider"),
            timestamp: text("timestamp"),
        })
    }
}
