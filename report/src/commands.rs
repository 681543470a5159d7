//! Commands of the report front end
//!
//! Each command is a request-scoped handler: it borrows the loaded facts,
//! runs the authorization check the operation needs and then the engine
//! that produces the answer. Answers are JSON bodies in the read API shape.

use std::collections::BTreeSet;
use std::path::Path;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use log::{debug, error, info, warn};
use ohmage_core::models::{AuthorizationQuery, CampaignId, Operation, RoleSet};
use ohmage_core::projection::{ProjectionRequest, Projector, ResultRow};
use ohmage_core::utils::StringUtils;
use ohmage_core::validators::{self, LIST_ITEM_SEPARATOR};
use ohmage_core::{Authorizer, CampaignFilter, CampaignSelector, InMemoryFacts};
use serde_json::{json, Value};

use crate::config::ReportConfig;
use crate::error::{to_failure_body, to_input_error, Result};

/// Loaded configuration and facts
#[derive(Debug)]
pub struct Report {
    config: ReportConfig,
    facts: InMemoryFacts,
}

impl Report {
    /// Create a report over already loaded facts
    pub fn new(config: ReportConfig, facts: InMemoryFacts) -> Self {
        Self { config, facts }
    }

    /// Load the facts snapshot named by the configuration
    pub fn load(config: ReportConfig) -> Result<Self> {
        let facts = InMemoryFacts::from_file(config.facts_path()?)?;
        info!("Loaded facts from {}", config.facts_path()?.display());
        Ok(Self::new(config, facts))
    }

    /// Configuration in use
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    fn authorizer(&self) -> Authorizer<'_, InMemoryFacts> {
        Authorizer::new(&self.facts)
    }

    /// Run one authorization query
    pub fn authorize(&self, query: &AuthorizationQuery) -> Result<Value> {
        self.authorizer().authorize(query)?;
        Ok(json!({ "result": "success" }))
    }

    /// List the campaigns of `user` matching the filter
    pub fn select(&self, user: &str, filter: &CampaignFilter) -> Result<Value> {
        self.authorizer().check_user_existence(user, true)?;
        let campaigns = CampaignSelector::new(&self.facts).select(user, filter)?;
        Ok(json!({ "result": "success", "data": campaigns }))
    }

    /// Members of a campaign grouped by role
    pub fn roster(&self, requester: &str, campaign: &str) -> Result<Value> {
        self.authorizer().verify_user_can_read_users_in_campaign(requester, campaign)?;
        let roster = CampaignSelector::new(&self.facts).campaign_roster(campaign)?;
        Ok(json!({ "result": "success", "data": roster }))
    }

    /// Check a `user;role,user;role` grant list against the requester's roles
    pub fn grant(&self, requester: &str, campaign: &str, user_role_list: &str) -> Result<Value> {
        let grants = validators::validate_user_and_campaign_role(user_role_list)?
            .ok_or_else(|| to_input_error("the user role list is empty"))?;

        let authorizer = self.authorizer();
        let mut requested = RoleSet::new();
        for roles in grants.values() {
            requested.extend_from(roles);
        }
        authorizer.verify_user_can_grant_or_revoke_roles(requester, campaign, &requested)?;

        let users: Vec<&str> = grants.keys().map(String::as_str).collect();
        authorizer.verify_users_exist(&users, true)?;
        Ok(json!({ "result": "success", "data": grants }))
    }

    /// Whether the requester may read personal information of the users
    pub fn personal_info(&self, requester: &str, users: &[String]) -> Result<Value> {
        self.authorizer().verify_user_can_read_users_personal_info(requester, users)?;
        Ok(json!({ "result": "success" }))
    }

    /// Project survey responses the requester is allowed to see
    pub fn project(
        &self,
        requester: &str,
        campaign: &str,
        target: Option<&str>,
        rows: &[ResultRow],
        request: &ProjectionRequest,
    ) -> Result<Value> {
        let authorizer = self.authorizer();
        authorizer.campaign_exists_and_user_belongs(campaign, requester)?;
        authorizer.requester_can_view_users_survey_responses(campaign, requester, target)?;

        if let Some(target) = target {
            if let Some(stray) = rows.iter().find(|row| row.login_id != target) {
                return Err(to_input_error(format!(
                    "rows for {} were supplied but the report targets {}",
                    stray.login_id, target
                )));
            }
        }

        let document = Projector::new(&self.config.core.projection).project(rows, request)?;
        debug!(
            "Projected {} meta-rows of {} for {}",
            document.row_count, campaign, requester
        );
        Ok(document.to_json())
    }
}

/// Turn a command outcome into the body to print
pub fn respond(outcome: Result<Value>) -> Value {
    match outcome {
        Ok(body) => body,
        Err(err) => {
            if err.is_client_error() {
                warn!("Request rejected: {}", err);
            } else {
                error!("Request failed: {}", err);
            }
            to_failure_body(&err)
        }
    }
}

/// Operation named on the command line
pub fn operation_from_name(name: &str, roles: Option<&str>) -> Result<Operation> {
    let operation = match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "read_campaign" => Operation::ReadCampaign,
        "view_survey_responses" => Operation::ViewSurveyResponses,
        "update_campaign" => Operation::UpdateCampaign,
        "update_campaign_xml" => Operation::UpdateCampaignXml,
        "grant_or_revoke_roles" => {
            let list = roles.ok_or_else(|| to_input_error("grant_or_revoke_roles needs --roles"))?;
            let mut parsed = RoleSet::new();
            for role in StringUtils::split_list(list, LIST_ITEM_SEPARATOR) {
                parsed.insert(role.parse()?);
            }
            Operation::GrantOrRevokeRoles { roles: parsed }
        }
        "delete_campaign" => Operation::DeleteCampaign,
        "read_users" => Operation::ReadUsers,
        "read_classes" => Operation::ReadClasses,
        "read_users_personal_info" => Operation::ReadUsersPersonalInfo,
        _ => return Err(to_input_error(format!("unknown operation: {}", name))),
    };
    Ok(operation)
}

/// Parse `YYYY-MM-DD` (midnight UTC) or an RFC 3339 instant
pub fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&midnight));
        }
    }
    DateTime::parse_from_rfc3339(value)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|err| to_input_error(format!("invalid date {}: {}", value, err)))
}

/// Comma separated list into a set, `None` when not supplied
pub fn parse_id_list(value: Option<&str>) -> Option<BTreeSet<CampaignId>> {
    value.map(|list| {
        StringUtils::split_list(list, LIST_ITEM_SEPARATOR)
            .into_iter()
            .map(str::to_string)
            .collect()
    })
}

/// Read flat result rows from a JSON array file
pub fn load_rows<P: AsRef<Path>>(path: P) -> Result<Vec<ResultRow>> {
    let file = std::fs::File::open(path.as_ref())?;
    let rows: Vec<ResultRow> = serde_json::from_reader(file)?;
    debug!("Read {} result rows from {}", rows.len(), path.as_ref().display());
    Ok(rows)
}

/// Read a projection request, every column when no file is given
pub fn load_request(path: Option<&Path>) -> Result<ProjectionRequest> {
    match path {
        Some(path) => {
            let file = std::fs::File::open(path)?;
            Ok(serde_json::from_reader(file)?)
        }
        None => Ok(ProjectionRequest::all()),
    }
}
