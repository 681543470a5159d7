//! Survey response projection
//!
//! Turns flat [`ResultRow`]s into a column-oriented [`Document`]:
//!
//! 1. resolve the requested columns, expanding [`SPECIAL_ALL`] to the
//!    declared column list;
//! 2. resolve the prompt columns, discovering them from the rows when the
//!    request is scoped by survey or asks for every prompt;
//! 3. group the rows into meta-rows;
//! 4. emit one value per column per meta-row, `"NA"` for prompts a
//!    meta-row has no answer for.

pub mod columns;
mod document;
mod grouping;
mod row;

pub use columns::{ColumnKey, ContextField, CONTEXT_PREFIX, PROMPT_PREFIX, SPECIAL_ALL};
pub use document::{Column, Document, PromptContext};
pub use grouping::{group_rows, Grouping, MetaRow, RowIdentity};
pub use row::{Location, ResultRow, LOCATION_UNAVAILABLE};

use std::collections::HashSet;
use log::debug;
use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::config::ProjectionConfig;
use crate::error::{invalid_argument, ErrorCode, Result};
use crate::utils::measure_time;

/// Value emitted for a prompt a meta-row has no answer for
pub const NOT_AVAILABLE: &str = "NA";

/// What the caller asked to see
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionRequest {
    /// Requested column URNs, or just [`SPECIAL_ALL`]
    #[serde(default)]
    pub columns: Vec<String>,

    /// Requested prompt ids (bare or URN), or just [`SPECIAL_ALL`]
    #[serde(default)]
    pub prompt_ids: Vec<String>,

    /// Survey scope; when present prompt columns are discovered from the rows
    #[serde(default)]
    pub survey_ids: Option<Vec<String>>,

    /// Campaign name for the campaign context column
    #[serde(default)]
    pub campaign_name: Option<String>,

    /// Campaign version for the campaign context column
    #[serde(default)]
    pub campaign_version: Option<String>,
}

impl ProjectionRequest {
    /// Request every declared column and every prompt present in the rows
    pub fn all() -> Self {
        ProjectionRequest {
            columns: vec![SPECIAL_ALL.to_string()],
            prompt_ids: vec![SPECIAL_ALL.to_string()],
            ..Default::default()
        }
    }

    fn discovers_prompts(&self) -> bool {
        self.survey_ids.is_some() || self.prompt_ids.first().map(String::as_str) == Some(SPECIAL_ALL)
    }
}

/// Projection engine configured with the declared column list
pub struct Projector<'a> {
    config: &'a ProjectionConfig,
}

impl<'a> Projector<'a> {
    /// Create a projector
    pub fn new(config: &'a ProjectionConfig) -> Self {
        Projector { config }
    }

    /// Project ordered rows into a document
    pub fn project(&self, rows: &[ResultRow], request: &ProjectionRequest) -> Result<Document> {
        measure_time("projection", || self.project_rows(rows, request))
    }

    fn project_rows(&self, rows: &[ResultRow], request: &ProjectionRequest) -> Result<Document> {
        let keys = self.resolve_columns(rows, request)?;
        let grouping = group_rows(rows, self.config.enforce_row_order)?;
        debug!(
            "Projecting {} rows into {} meta-rows across {} columns",
            rows.len(),
            grouping.meta_rows.len(),
            keys.len()
        );

        let columns = keys
            .into_iter()
            .map(|key| columnize(key, &grouping, request))
            .collect();

        Ok(Document {
            columns,
            row_count: grouping.meta_rows.len(),
            prompt_count: rows.len(),
        })
    }

    fn resolve_columns(&self, rows: &[ResultRow], request: &ProjectionRequest) -> Result<Vec<ColumnKey>> {
        if request.columns.is_empty() && request.prompt_ids.is_empty() && request.survey_ids.is_none() {
            return Err(invalid_argument(ErrorCode::SurveyInvalidColumn, "At least one column is required."));
        }

        let requested = match request.columns.first() {
            Some(first) if first == SPECIAL_ALL => &self.config.declared_columns,
            _ => &request.columns,
        };

        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for urn in requested {
            let key: ColumnKey = urn.parse()?;
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }

        let prompts: Vec<ColumnKey> = if request.discovers_prompts() {
            rows.iter().map(|row| ColumnKey::prompt(&row.prompt_id)).collect()
        } else {
            request.prompt_ids.iter().map(|id| ColumnKey::prompt(id)).collect()
        };
        for key in prompts {
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }

        Ok(keys)
    }
}

fn columnize(key: ColumnKey, grouping: &Grouping<'_>, request: &ProjectionRequest) -> Column {
    match &key {
        ColumnKey::Context(field) => {
            let values = grouping
                .meta_rows
                .iter()
                .map(|meta| match field {
                    ContextField::CampaignName => Value::from(request.campaign_name.clone()),
                    ContextField::CampaignVersion => Value::from(request.campaign_version.clone()),
                    _ => meta.context_value(*field),
                })
                .collect();
            Column { key, context: None, values }
        }
        ColumnKey::Prompt(id) => {
            let values = grouping
                .meta_rows
                .iter()
                .map(|meta| {
                    meta.prompt_value(id)
                        .cloned()
                        .unwrap_or_else(|| Value::from(NOT_AVAILABLE))
                })
                .collect();
            let context = grouping
                .prompt_contexts
                .get(id.as_str())
                .cloned()
                .unwrap_or_default();
            Column { key, context: Some(context), values }
        }
    }
}

/// Project with the default configuration
pub fn project(rows: &[ResultRow], request: &ProjectionRequest) -> Result<Document> {
    let config = ProjectionConfig::default();
    Projector::new(&config).project(rows, request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(user: &str, prompt: &str, set: Option<&str>, value: Value) -> ResultRow {
        ResultRow {
            login_id: user.to_string(),
            client: "android".to_string(),
            survey_id: "daily".to_string(),
            prompt_id: prompt.to_string(),
            timestamp: "2011-04-02 08:15:00".to_string(),
            timezone: "America/New_York".to_string(),
            repeatable_set_id: set.map(str::to_string),
            repeatable_set_iteration: set.map(|_| 0),
            display_value: value,
            display_label: Some(format!("Label {}", prompt)),
            prompt_type: Some("single_choice".to_string()),
            display_type: Some("category".to_string()),
            unit: None,
            launch_context: Some("{\"launch_time\":\"2011-04-02 08:14:00\"}".to_string()),
            location_status: Some("valid".to_string()),
            location: Some("{\"latitude\":40.7,\"longitude\":-74.0,\"accuracy\":15,\"provider\":\"network\",\"timestamp\":\"2011-04-02 08:13:59\"}".to_string()),
        }
    }

    fn request(columns: &[&str], prompts: &[&str]) -> ProjectionRequest {
        ProjectionRequest {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            prompt_ids: prompts.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_rows_keep_requested_columns() {
        let request = request(&["urn:ohmage:context:user", "urn:ohmage:context:timestamp"], &["q1", "q2"]);
        let document = project(&[], &request).unwrap();

        assert_eq!(document.row_count, 0);
        assert_eq!(document.prompt_count, 0);
        assert_eq!(
            document.column_names(),
            vec![
                "urn:ohmage:context:user",
                "urn:ohmage:context:timestamp",
                "urn:ohmage:prompt:id:q1",
                "urn:ohmage:prompt:id:q2",
            ]
        );
        assert!(document.columns.iter().all(|column| column.values.is_empty()));
        assert_eq!(document.to_json()["metadata"]["number_of_surveys"], 0);
    }

    #[test]
    fn test_two_users_with_and_without_repeatable_set() {
        let rows = vec![
            row("alice", "q1", None, json!("yes")),
            row("alice", "q2", None, json!(3)),
            row("alice", "q3", None, json!("tired")),
            row("bob", "q1", Some("meals"), json!("no")),
            row("bob", "q3", Some("meals"), json!("fine")),
        ];
        let request = ProjectionRequest {
            columns: vec!["urn:ohmage:context:user".to_string(), "urn:ohmage:context:repeatable_set:id".to_string()],
            survey_ids: Some(vec!["daily".to_string()]),
            ..Default::default()
        };

        let document = project(&rows, &request).unwrap();
        assert_eq!(document.row_count, 2);
        assert_eq!(document.prompt_count, 5);

        assert_eq!(document.column("urn:ohmage:context:user").unwrap().values, vec![json!("alice"), json!("bob")]);
        assert_eq!(
            document.column("urn:ohmage:context:repeatable_set:id").unwrap().values,
            vec![Value::Null, json!("meals")]
        );
        assert_eq!(document.column("urn:ohmage:prompt:id:q2").unwrap().values, vec![json!(3), json!("NA")]);
        assert_eq!(document.column("urn:ohmage:prompt:id:q3").unwrap().values, vec![json!("tired"), json!("fine")]);
    }

    #[test]
    fn test_single_row() {
        let rows = vec![row("alice", "q1", None, json!("yes"))];
        let document = project(&rows, &ProjectionRequest::all()).unwrap();

        assert_eq!(document.row_count, 1);
        for column in &document.columns {
            assert_eq!(column.values.len(), 1);
        }
        assert_eq!(document.column("urn:ohmage:prompt:id:q1").unwrap().values, vec![json!("yes")]);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_all_columns_expand_to_declared_list() {
        let rows = vec![row("alice", "q1", None, json!("yes"))];
        let config = ProjectionConfig {
            declared_columns: vec!["urn:ohmage:context:client".to_string(), "urn:ohmage:context:utc_timestamp".to_string()],
            enforce_row_order: true,
        };
        let mut all = ProjectionRequest::all();
        all.campaign_name = Some("Sleep study".to_string());

        let document = Projector::new(&config).project(&rows, &all).unwrap();
        assert_eq!(
            document.column_names(),
            vec!["urn:ohmage:context:client", "urn:ohmage:context:utc_timestamp", "urn:ohmage:prompt:id:q1"]
        );
        // EDT is UTC-4 on April 2nd 2011
        assert_eq!(
            document.column("urn:ohmage:context:utc_timestamp").unwrap().values,
            vec![json!("2011-04-02 12:15:00")]
        );
    }

    #[test]
    fn test_context_columns() {
        let rows = vec![row("alice", "q1", None, json!("yes"))];
        let mut request = request(
            &[
                "urn:ohmage:context:location:latitude",
                "urn:ohmage:context:location:provider",
                "urn:ohmage:context:location:timestamp",
                "urn:ohmage:context:campaign:name",
                "urn:ohmage:context:campaign:version",
                "urn:ohmage:context:survey_launch_context",
            ],
            &[],
        );
        request.campaign_name = Some("Sleep study".to_string());

        let document = project(&rows, &request).unwrap();
        let values: Vec<Value> = document.columns.iter().map(|column| column.values[0].clone()).collect();
        assert_eq!(
            values,
            vec![
                json!(40.7),
                json!("network"),
                json!("2011-04-02 08:13:59"),
                json!("Sleep study"),
                Value::Null,
                json!("{\"launch_time\":\"2011-04-02 08:14:00\"}"),
            ]
        );
    }

    #[test]
    fn test_explicit_prompts_are_not_discovered() {
        let rows = vec![
            row("alice", "q1", None, json!("yes")),
            row("alice", "q2", None, json!(3)),
        ];
        let request = request(&["urn:ohmage:context:user"], &["urn:ohmage:prompt:id:q2", "q9"]);

        let document = project(&rows, &request).unwrap();
        assert_eq!(
            document.column_names(),
            vec!["urn:ohmage:context:user", "urn:ohmage:prompt:id:q2", "urn:ohmage:prompt:id:q9"]
        );
        let missing = document.column("urn:ohmage:prompt:id:q9").unwrap();
        assert_eq!(missing.values, vec![json!("NA")]);
        assert_eq!(missing.context, Some(PromptContext::default()));
        assert_eq!(
            document.column("urn:ohmage:prompt:id:q2").unwrap().context.as_ref().unwrap().display_label.as_deref(),
            Some("Label q2")
        );
    }

    #[test]
    fn test_discovered_prompts_keep_first_seen_order() {
        let rows = vec![
            row("alice", "q3", None, json!(1)),
            row("alice", "q1", None, json!(2)),
            row("bob", "q3", None, json!(3)),
            row("bob", "q2", None, json!(4)),
        ];
        let request = request(&["urn:ohmage:context:user", "urn:ohmage:prompt:id:q1"], &[SPECIAL_ALL]);

        let document = project(&rows, &request).unwrap();
        assert_eq!(
            document.column_names(),
            vec![
                "urn:ohmage:context:user",
                "urn:ohmage:prompt:id:q1",
                "urn:ohmage:prompt:id:q3",
                "urn:ohmage:prompt:id:q2",
            ]
        );
    }

    #[test]
    fn test_invalid_requests() {
        let err = project(&[], &request(&["urn:ohmage:context:weather"], &[])).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SurveyInvalidColumn);

        let err = project(&[], &ProjectionRequest::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SurveyInvalidColumn);
    }

    #[test]
    fn test_unordered_rows_are_rejected() {
        let rows = vec![
            row("alice", "q1", None, json!("yes")),
            row("bob", "q1", None, json!("no")),
            row("alice", "q2", None, json!(3)),
        ];
        let err = project(&rows, &ProjectionRequest::all()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SurveyUnorderedResults);

        let lenient = ProjectionConfig { enforce_row_order: false, ..ProjectionConfig::default() };
        let document = Projector::new(&lenient).project(&rows, &ProjectionRequest::all()).unwrap();
        assert_eq!(document.row_count, 3);
    }
}
