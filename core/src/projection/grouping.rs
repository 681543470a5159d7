//! Meta-row grouping
//!
//! Rows sharing (user, timestamp, survey, repeatable set id, repeatable set
//! iteration) fold into one [`MetaRow`]. The scan is a single forward pass,
//! so such rows must arrive contiguously; a closed identity that shows up
//! again is reported as `SURVEY_UNORDERED_RESULTS` unless ordering
//! enforcement is switched off.
//!
//! Only contiguity is checked. Groups may come in any order relative to each
//! other, so rows need not be sorted by user or timestamp.

use std::collections::{HashMap, HashSet};
use log::warn;
use serde_json::Value;

use crate::error::{invalid_argument, ErrorCode, Result};
use super::columns::ContextField;
use super::document::PromptContext;
use super::row::{Location, ResultRow};

/// Grouping key of a row; `None` parts compare equal to each other only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowIdentity<'a> {
    /// Login name
    pub login_id: &'a str,
    /// Local timestamp
    pub timestamp: &'a str,
    /// Survey id
    pub survey_id: &'a str,
    /// Repeatable set id
    pub repeatable_set_id: Option<&'a str>,
    /// Repeatable set iteration
    pub repeatable_set_iteration: Option<i64>,
}

impl<'a> RowIdentity<'a> {
    /// Identity of a row
    pub fn of(row: &'a ResultRow) -> Self {
        RowIdentity {
            login_id: &row.login_id,
            timestamp: &row.timestamp,
            survey_id: &row.survey_id,
            repeatable_set_id: row.repeatable_set_id.as_deref(),
            repeatable_set_iteration: row.repeatable_set_iteration,
        }
    }
}

/// All responses of one survey pass
#[derive(Debug, Clone)]
pub struct MetaRow<'a> {
    first: &'a ResultRow,
    location: Option<Location>,
    utc_timestamp: Option<String>,
    prompt_values: HashMap<&'a str, &'a Value>,
}

impl<'a> MetaRow<'a> {
    fn open(row: &'a ResultRow) -> Self {
        let location = match row.parsed_location() {
            Ok(location) => location,
            Err(err) => {
                warn!(
                    "Dropping location of {} at {} in survey {}: {}",
                    row.login_id, row.timestamp, row.survey_id, err
                );
                None
            }
        };

        MetaRow {
            first: row,
            location,
            utc_timestamp: row.utc_timestamp(),
            prompt_values: HashMap::new(),
        }
    }

    fn record(&mut self, row: &'a ResultRow) {
        self.prompt_values.insert(&row.prompt_id, &row.display_value);
    }

    /// Grouping key
    pub fn identity(&self) -> RowIdentity<'a> {
        RowIdentity::of(self.first)
    }

    /// Response to a prompt, `None` when not shown or answered in this pass
    pub fn prompt_value(&self, prompt_id: &str) -> Option<&'a Value> {
        self.prompt_values
            .get(prompt_id)
            .copied()
            .filter(|value| !value.is_null())
    }

    /// Value of a context field; campaign fields come from the request, not the row
    pub fn context_value(&self, field: ContextField) -> Value {
        let row = self.first;
        let location = self.location.as_ref();
        match field {
            ContextField::User => Value::from(row.login_id.as_str()),
            ContextField::Client => Value::from(row.client.as_str()),
            ContextField::Timestamp => Value::from(row.timestamp.as_str()),
            ContextField::Timezone => Value::from(row.timezone.as_str()),
            ContextField::UtcTimestamp => Value::from(self.utc_timestamp.clone()),
            ContextField::SurveyLaunchContext => Value::from(row.launch_context.clone()),
            ContextField::LocationStatus => Value::from(row.location_status.clone()),
            ContextField::LocationLatitude => Value::from(location.and_then(|l| l.latitude)),
            ContextField::LocationLongitude => Value::from(location.and_then(|l| l.longitude)),
            ContextField::LocationTimestamp => Value::from(location.and_then(|l| l.timestamp.clone())),
            ContextField::LocationAccuracy => Value::from(location.and_then(|l| l.accuracy)),
            ContextField::LocationProvider => Value::from(location.and_then(|l| l.provider.clone())),
            ContextField::RepeatableSetId => Value::from(row.repeatable_set_id.clone()),
            ContextField::RepeatableSetIteration => Value::from(row.repeatable_set_iteration),
            ContextField::CampaignName | ContextField::CampaignVersion => Value::Null,
        }
    }
}

/// Result of the grouping pass
#[derive(Debug, Clone, Default)]
pub struct Grouping<'a> {
    /// Meta-rows in the order their identities first appeared
    pub meta_rows: Vec<MetaRow<'a>>,

    /// Context of every prompt seen, keyed by prompt id
    pub prompt_contexts: HashMap<&'a str, PromptContext>,
}

/// Fold ordered rows into meta-rows
///
/// The caller's slice is never modified. With `enforce_order` unset, a
/// reappearing identity opens a fresh meta-row instead of failing.
pub fn group_rows(rows: &[ResultRow], enforce_order: bool) -> Result<Grouping<'_>> {
    let mut grouping = Grouping::default();
    let Some((first, rest)) = rows.split_first() else {
        return Ok(grouping);
    };

    let mut closed: HashSet<RowIdentity<'_>> = HashSet::new();
    let mut current = MetaRow::open(first);
    let mut current_identity = RowIdentity::of(first);
    grouping.absorb_context(first);
    current.record(first);

    for row in rest {
        let identity = RowIdentity::of(row);
        if identity != current_identity {
            closed.insert(current_identity);
            if closed.contains(&identity) {
                if enforce_order {
                    return Err(invalid_argument(
                        ErrorCode::SurveyUnorderedResults,
                        format!(
                            "Results are not grouped by survey response: {} at {} in survey {} appears twice",
                            row.login_id, row.timestamp, row.survey_id
                        ),
                    ));
                }
                warn!(
                    "Unordered results: {} at {} in survey {} reappeared",
                    row.login_id, row.timestamp, row.survey_id
                );
            }
            grouping.meta_rows.push(std::mem::replace(&mut current, MetaRow::open(row)));
            current_identity = identity;
        }
        grouping.absorb_context(row);
        current.record(row);
    }
    grouping.meta_rows.push(current);

    Ok(grouping)
}

impl<'a> Grouping<'a> {
    fn absorb_context(&mut self, row: &'a ResultRow) {
        self.prompt_contexts
            .entry(row.prompt_id.as_str())
            .or_insert_with(|| PromptContext::from_row(row));
    }
}
