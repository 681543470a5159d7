//! Campaign state
//!
//! The core only ever reads campaign state; campaign management lives in
//! the data-access layer.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::error::{invalid_argument, CoreError, ErrorCode};
use super::{ClassId, RoleSet, UserId, CampaignId, Role};

/// Governs analyst visibility of responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyState {
    /// Analysts may read other users' responses
    Shared,

    /// Only supervisors and authors may read other users' responses
    Private,
}

impl PrivacyState {
    /// Wire name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyState::Shared => "shared",
            PrivacyState::Private => "private",
        }
    }
}

impl fmt::Display for PrivacyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrivacyState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared" => Ok(PrivacyState::Shared),
            "private" => Ok(PrivacyState::Private),
            _ => Err(invalid_argument(
                ErrorCode::CampaignInvalidPrivacyState,
                format!("The privacy state is unknown: {}", s),
            )),
        }
    }
}

/// Governs whether participants may read their own responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunningState {
    /// Accepting uploads
    Running,

    /// Closed for uploads
    Stopped,
}

impl RunningState {
    /// Wire name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            RunningState::Running => "running",
            RunningState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for RunningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunningState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "running" => Ok(RunningState::Running),
            "stopped" => Ok(RunningState::Stopped),
            _ => Err(invalid_argument(
                ErrorCode::CampaignInvalidRunningState,
                format!("The running state is unknown: {}", s),
            )),
        }
    }
}

/// Everything the core needs to know about one campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignState {
    /// Campaign URN
    pub id: CampaignId,

    /// Privacy state
    pub privacy_state: PrivacyState,

    /// Running state
    pub running_state: RunningState,

    /// Creation timestamp
    pub creation_timestamp: DateTime<Utc>,

    /// Classes the campaign is associated with
    #[serde(default)]
    pub classes: BTreeSet<ClassId>,

    /// Role sets of every member
    #[serde(default)]
    pub user_roles: BTreeMap<UserId, RoleSet>,

    /// Number of survey responses uploaded so far
    #[serde(default)]
    pub response_count: u64,
}

impl CampaignState {
    /// Create a campaign with no members, created now
    pub fn new(id: impl Into<CampaignId>, privacy_state: PrivacyState, running_state: RunningState) -> Self {
        CampaignState {
            id: id.into(),
            privacy_state,
            running_state,
            creation_timestamp: Utc::now(),
            classes: BTreeSet::new(),
            user_roles: BTreeMap::new(),
            response_count: 0,
        }
    }

    /// Set the creation timestamp
    pub fn created_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.creation_timestamp = timestamp;
        self
    }

    /// Associate the campaign with a class
    pub fn with_class(mut self, class_id: impl Into<ClassId>) -> Self {
        self.classes.insert(class_id.into());
        self
    }

    /// Give a user roles in the campaign, merging with any they already hold
    pub fn with_user<I: IntoIterator<Item = Role>>(mut self, user: impl Into<UserId>, roles: I) -> Self {
        let entry = self.user_roles.entry(user.into()).or_default();
        for role in roles {
            entry.insert(role);
        }
        self
    }

    /// Set the number of uploaded responses
    pub fn with_responses(mut self, count: u64) -> Self {
        self.response_count = count;
        self
    }

    /// Role set of a user, empty when the user does not belong
    pub fn roles_of(&self, user: &str) -> RoleSet {
        self.user_roles.get(user).cloned().unwrap_or_default()
    }
}
