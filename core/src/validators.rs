//! Parsers for request parameters
//!
//! The request layer hands over raw strings. These helpers turn them into
//! typed values, treating blank input as "not supplied".

use std::collections::BTreeMap;
use std::str::FromStr;
use log::debug;

use crate::error::{invalid_argument, CoreError, ErrorCode, Result};
use crate::models::{PrivacyState, Role, RoleSet, RunningState, UserId};
use crate::utils::StringUtils;

/// Separates items of a list parameter
pub const LIST_ITEM_SEPARATOR: char = ',';

/// Separates an entity from its role
pub const ENTITY_ROLE_SEPARATOR: char = ';';

const ECHO_LIMIT: usize = 64;

fn optional<T>(value: &str) -> Result<Option<T>>
where
    T: FromStr<Err = CoreError>,
{
    if StringUtils::is_blank(value) {
        return Ok(None);
    }
    value.parse().map(Some)
}

/// Parse a campaign role; blank input is `None`
pub fn validate_role(value: &str) -> Result<Option<Role>> {
    optional(value)
}

/// Parse a privacy state; blank input is `None`
pub fn validate_privacy_state(value: &str) -> Result<Option<PrivacyState>> {
    optional(value)
}

/// Parse a running state; blank input is `None`
pub fn validate_running_state(value: &str) -> Result<Option<RunningState>> {
    optional(value)
}

/// Parse a `user;role,user;role` list into the roles of every user
///
/// Returns `None` when the list is blank or holds nothing but separators.
/// A user listed more than once collects all of its roles.
pub fn validate_user_and_campaign_role(list: &str) -> Result<Option<BTreeMap<UserId, RoleSet>>> {
    debug!("Validating a list of user and campaign role pairs");

    let mut result: BTreeMap<UserId, RoleSet> = BTreeMap::new();
    for pair in StringUtils::split_list(list, LIST_ITEM_SEPARATOR) {
        if pair.len() == 1 && pair.starts_with(ENTITY_ROLE_SEPARATOR) {
            continue;
        }

        let mut parts: Vec<&str> = pair.split(ENTITY_ROLE_SEPARATOR).collect();
        while parts.last().map_or(false, |part| part.is_empty()) {
            parts.pop();
        }
        let [username, role] = parts.as_slice() else {
            return Err(invalid_argument(
                ErrorCode::CampaignInvalidRole,
                format!(
                    "The user campaign-role list is invalid: {}",
                    StringUtils::truncate(pair, ECHO_LIMIT)
                ),
            ));
        };

        let username = username.trim();
        if username.is_empty() {
            return Err(invalid_argument(
                ErrorCode::UserInvalidUsername,
                format!(
                    "The username in the username, campaign role pair is missing: {}",
                    StringUtils::truncate(pair, ECHO_LIMIT)
                ),
            ));
        }

        let role = validate_role(role)?.ok_or_else(|| {
            invalid_argument(
                ErrorCode::CampaignInvalidRole,
                format!(
                    "The campaign role in the username, campaign role pair is missing: {}",
                    StringUtils::truncate(pair, ECHO_LIMIT)
                ),
            )
        })?;

        result.entry(username.to_string()).or_default().insert(role);
    }

    if result.is_empty() {
        Ok(None)
    } else {
        Ok(Some(result))
    }
}
