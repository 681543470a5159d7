//! Campaign roles
//!
//! A user may hold several roles in one campaign at once, so checks are
//! always made against a [`RoleSet`]. An empty set means the user does not
//! belong to the campaign.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize};

use crate::error::{invalid_argument, CoreError, ErrorCode};

/// Campaign-scoped privilege level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Owns the campaign and its participants
    Supervisor,

    /// Designed the campaign
    Author,

    /// Reads responses, subject to the campaign's privacy state
    Analyst,

    /// Submits responses
    Participant,
}

impl Role {
    /// Every role, most privileged first
    pub const ALL: [Role; 4] = [Role::Supervisor, Role::Author, Role::Analyst, Role::Participant];

    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Supervisor => "supervisor",
            Role::Author => "author",
            Role::Analyst => "analyst",
            Role::Participant => "participant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supervisor" => Ok(Role::Supervisor),
            "author" => Ok(Role::Author),
            "analyst" => Ok(Role::Analyst),
            "participant" => Ok(Role::Participant),
            _ => Err(invalid_argument(
                ErrorCode::CampaignInvalidRole,
                format!("The campaign role is unknown: {}", s),
            )),
        }
    }
}

/// The roles one user holds in one campaign
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    /// Create an empty role set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role, returning whether it was new
    pub fn insert(&mut self, role: Role) -> bool {
        self.0.insert(role)
    }

    /// Whether the set holds the role
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    /// Whether the set holds at least one of the roles
    pub fn contains_any(&self, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.0.contains(role))
    }

    /// Whether the user holds no role, i.e. does not belong
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of roles held
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the roles in privilege order
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    /// Merge another set into this one
    pub fn extend_from(&mut self, other: &RoleSet) {
        self.0.extend(other.iter());
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        RoleSet(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Role; N]> for RoleSet {
    fn from(roles: [Role; N]) -> Self {
        roles.into_iter().collect()
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Role::as_str).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}
