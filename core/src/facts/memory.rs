//! In-memory fact provider
//!
//! Backed by a [`FactSnapshot`] that can be loaded from JSON. Used by the
//! report front end and by tests.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Serialize, Deserialize};

use crate::error::{DataAccessError, Result};
use crate::models::{CampaignId, CampaignState, ClassId, PrivacyState, Role, RoleSet, RunningState, UserId};
use super::{FactProvider, FactResult};

/// A user account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Login name
    pub username: UserId,

    /// System administrator flag
    #[serde(default)]
    pub admin: bool,

    /// Whether the user may create campaigns
    #[serde(default)]
    pub campaign_creation_privilege: bool,
}

/// A class and the users privileged in it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    /// Class URN
    pub id: ClassId,

    /// Users holding the privileged class role
    #[serde(default)]
    pub privileged: BTreeSet<UserId>,
}

/// Serialized form of the facts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactSnapshot {
    /// User accounts
    #[serde(default)]
    pub users: Vec<UserRecord>,

    /// Classes
    #[serde(default)]
    pub classes: Vec<ClassRecord>,

    /// Campaigns
    #[serde(default)]
    pub campaigns: Vec<CampaignState>,
}

/// Fact provider over plain maps
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "FactSnapshot")]
pub struct InMemoryFacts {
    users: BTreeMap<UserId, UserRecord>,
    classes: BTreeMap<ClassId, ClassRecord>,
    campaigns: BTreeMap<CampaignId, CampaignState>,
}

impl From<FactSnapshot> for InMemoryFacts {
    fn from(snapshot: FactSnapshot) -> Self {
        let mut facts = InMemoryFacts::new();
        for user in snapshot.users {
            facts = facts.with_user(user);
        }
        for class in snapshot.classes {
            facts = facts.with_class(class);
        }
        for campaign in snapshot.campaigns {
            facts = facts.with_campaign(campaign);
        }
        facts
    }
}

impl InMemoryFacts {
    /// Create an empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let snapshot: FactSnapshot = serde_json::from_reader(file)?;
        debug!(
            "Loaded facts snapshot from {}: {} users, {} classes, {} campaigns",
            path.as_ref().display(),
            snapshot.users.len(),
            snapshot.classes.len(),
            snapshot.campaigns.len()
        );
        Ok(snapshot.into())
    }

    /// Parse a snapshot from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: FactSnapshot = serde_json::from_str(json)?;
        Ok(snapshot.into())
    }

    /// Add or replace a user account
    pub fn with_user(mut self, user: UserRecord) -> Self {
        self.users.insert(user.username.clone(), user);
        self
    }

    /// Add or replace a class
    pub fn with_class(mut self, class: ClassRecord) -> Self {
        self.classes.insert(class.id.clone(), class);
        self
    }

    /// Add or replace a campaign
    pub fn with_campaign(mut self, campaign: CampaignState) -> Self {
        self.campaigns.insert(campaign.id.clone(), campaign);
        self
    }

    /// Look up a campaign
    pub fn campaign(&self, campaign: &str) -> Option<&CampaignState> {
        self.campaigns.get(campaign)
    }

    fn select<F>(&self, predicate: F) -> BTreeSet<CampaignId>
    where
        F: Fn(&CampaignState) -> bool,
    {
        self.campaigns
            .values()
            .filter(|campaign| predicate(campaign))
            .map(|campaign| campaign.id.clone())
            .collect()
    }
}

impl FactProvider for InMemoryFacts {
    fn user_exists(&self, user: &str) -> FactResult<bool> {
        Ok(self.users.contains_key(user)
            || self.campaigns.values().any(|campaign| campaign.user_roles.contains_key(user)))
    }

    fn campaign_exists(&self, campaign: &str) -> FactResult<bool> {
        Ok(self.campaigns.contains_key(campaign))
    }

    fn roles_of(&self, user: &str, campaign: &str) -> FactResult<RoleSet> {
        Ok(self
            .campaigns
            .get(campaign)
            .map(|state| state.roles_of(user))
            .unwrap_or_default())
    }

    fn campaign_privacy_state(&self, campaign: &str) -> FactResult<Option<PrivacyState>> {
        Ok(self.campaigns.get(campaign).map(|state| state.privacy_state))
    }

    fn campaign_running_state(&self, campaign: &str) -> FactResult<Option<RunningState>> {
        Ok(self.campaigns.get(campaign).map(|state| state.running_state))
    }

    fn response_count_for_campaign(&self, campaign: &str) -> FactResult<u64> {
        self.campaigns
            .get(campaign)
            .map(|state| state.response_count)
            .ok_or_else(|| DataAccessError::Query(format!("no such campaign: {}", campaign)))
    }

    fn campaigns_associated_with_class(&self, class: &str) -> FactResult<BTreeSet<CampaignId>> {
        Ok(self.select(|campaign| campaign.classes.contains(class)))
    }

    fn campaigns_on_or_after(&self, date: DateTime<Utc>) -> FactResult<BTreeSet<CampaignId>> {
        Ok(self.select(|campaign| campaign.creation_timestamp >= date))
    }

    fn campaigns_on_or_before(&self, date: DateTime<Utc>) -> FactResult<BTreeSet<CampaignId>> {
        Ok(self.select(|campaign| campaign.creation_timestamp <= date))
    }

    fn campaigns_with_privacy_state(&self, state: PrivacyState) -> FactResult<BTreeSet<CampaignId>> {
        Ok(self.select(|campaign| campaign.privacy_state == state))
    }

    fn campaigns_with_running_state(&self, state: RunningState) -> FactResult<BTreeSet<CampaignId>> {
        Ok(self.select(|campaign| campaign.running_state == state))
    }

    fn campaigns_where_user_has_role(&self, user: &str, role: Role) -> FactResult<BTreeSet<CampaignId>> {
        Ok(self.select(|campaign| campaign.roles_of(user).contains(role)))
    }

    fn all_campaigns_for_user(&self, user: &str) -> FactResult<BTreeSet<CampaignId>> {
        Ok(self.select(|campaign| !campaign.roles_of(user).is_empty()))
    }

    fn classes_where_user_privileged(&self, user: &str) -> FactResult<BTreeSet<ClassId>> {
        Ok(self
            .classes
            .values()
            .filter(|class| class.privileged.contains(user))
            .map(|class| class.id.clone())
            .collect())
    }

    fn users_in_campaign(&self, campaign: &str) -> FactResult<BTreeMap<UserId, RoleSet>> {
        Ok(self
            .campaigns
            .get(campaign)
            .map(|state| {
                state
                    .user_roles
                    .iter()
                    .filter(|(_, roles)| !roles.is_empty())
                    .map(|(user, roles)| (user.clone(), roles.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn user_is_admin(&self, user: &str) -> FactResult<bool> {
        Ok(self.users.get(user).map(|record| record.admin).unwrap_or(false))
    }

    fn user_can_create_campaigns(&self, user: &str) -> FactResult<bool> {
        Ok(self
            .users
            .get(user)
            .map(|record| record.campaign_creation_privilege)
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SNAPSHOT: &str = r#"{
        "users": [
            { "username": "root", "admin": true, "campaign_creation_privilege": true },
            { "username": "carol" }
        ],
        "classes": [
            { "id": "urn:class:bio101", "privileged": ["carol"] }
        ],
        "campaigns": [
            {
                "id": "urn:campaign:sleep",
                "privacy_state": "shared",
                "running_state": "running",
                "creation_timestamp": "2011-02-01T00:00:00Z",
                "classes": ["urn:class:bio101"],
                "user_roles": { "alice": ["analyst"], "bob": ["participant"] },
                "response_count": 12
            },
            {
                "id": "urn:campaign:diet",
                "privacy_state": "private",
                "running_state": "stopped",
                "creation_timestamp": "2011-06-01T00:00:00Z",
                "user_roles": { "alice": ["supervisor", "participant"] }
            }
        ]
    }"#;

    #[test]
    fn test_snapshot_lookups() {
        let facts = InMemoryFacts::from_json(SNAPSHOT).unwrap();

        assert!(facts.user_exists("root").unwrap());
        assert!(facts.user_exists("bob").unwrap());
        assert!(!facts.user_exists("mallory").unwrap());
        assert!(facts.campaign_exists("urn:campaign:sleep").unwrap());

        assert_eq!(facts.roles_of("alice", "urn:campaign:sleep").unwrap(), RoleSet::from([Role::Analyst]));
        assert!(facts.roles_of("alice", "urn:campaign:missing").unwrap().is_empty());
        assert_eq!(
            facts.campaign_privacy_state("urn:campaign:diet").unwrap(),
            Some(PrivacyState::Private)
        );
        assert_eq!(facts.campaign_running_state("urn:campaign:missing").unwrap(), None);
        assert_eq!(facts.response_count_for_campaign("urn:campaign:sleep").unwrap(), 12);

        assert_eq!(facts.all_campaigns_for_user("alice").unwrap().len(), 2);
        assert_eq!(
            facts.campaigns_where_user_has_role("alice", Role::Supervisor).unwrap(),
            BTreeSet::from(["urn:campaign:diet".to_string()])
        );
        assert_eq!(
            facts.classes_where_user_privileged("carol").unwrap(),
            BTreeSet::from(["urn:class:bio101".to_string()])
        );
        assert!(facts.user_is_admin("root").unwrap());
        assert!(!facts.user_can_create_campaigns("carol").unwrap());
    }

    #[test]
    fn test_date_filters_are_inclusive() {
        let facts = InMemoryFacts::from_json(SNAPSHOT).unwrap();
        let boundary = Utc.with_ymd_and_hms(2011, 6, 1, 0, 0, 0).unwrap();

        assert_eq!(
            facts.campaigns_on_or_after(boundary).unwrap(),
            BTreeSet::from(["urn:campaign:diet".to_string()])
        );
        assert_eq!(facts.campaigns_on_or_before(boundary).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_campaign_response_count_fails() {
        let facts = InMemoryFacts::new();
        assert!(matches!(
            facts.response_count_for_campaign("urn:campaign:none"),
            Err(DataAccessError::Query(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SNAPSHOT.as_bytes()).unwrap();

        let facts = InMemoryFacts::from_file(file.path()).unwrap();
        assert_eq!(facts.users_in_campaign("urn:campaign:sleep").unwrap().len(), 2);
        assert!(facts.campaign("urn:campaign:diet").is_some());
    }
}
