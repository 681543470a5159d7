//! Fact provider interface
//!
//! The engines never talk to the backing store directly. Everything they
//! need to know about users, campaigns and classes comes through
//! [`FactProvider`], whose implementations hold no business logic. Failures
//! are reported as [`DataAccessError`] and are always propagated unchanged.

mod memory;

pub use memory::{ClassRecord, FactSnapshot, InMemoryFacts, UserRecord};

use std::collections::{BTreeMap, BTreeSet};
use chrono::{DateTime, Utc};

use crate::error::DataAccessError;
use crate::models::{CampaignId, ClassId, PrivacyState, Role, RoleSet, RunningState, UserId};

/// Result type for fact lookups
pub type FactResult<T> = std::result::Result<T, DataAccessError>;

/// Read-only source of role and state facts
#[cfg_attr(test, mockall::automock)]
pub trait FactProvider: Send + Sync {
    /// Whether the user account exists
    fn user_exists(&self, user: &str) -> FactResult<bool>;

    /// Whether the campaign exists
    fn campaign_exists(&self, campaign: &str) -> FactResult<bool>;

    /// Roles the user holds in the campaign, empty when not a member
    fn roles_of(&self, user: &str, campaign: &str) -> FactResult<RoleSet>;

    /// Privacy state, `None` when the campaign is unknown
    fn campaign_privacy_state(&self, campaign: &str) -> FactResult<Option<PrivacyState>>;

    /// Running state, `None` when the campaign is unknown
    fn campaign_running_state(&self, campaign: &str) -> FactResult<Option<RunningState>>;

    /// Number of survey responses uploaded to the campaign
    fn response_count_for_campaign(&self, campaign: &str) -> FactResult<u64>;

    /// Campaigns associated with the class
    fn campaigns_associated_with_class(&self, class: &str) -> FactResult<BTreeSet<CampaignId>>;

    /// Campaigns created on or after the instant
    fn campaigns_on_or_after(&self, date: DateTime<Utc>) -> FactResult<BTreeSet<CampaignId>>;

    /// Campaigns created on or before the instant
    fn campaigns_on_or_before(&self, date: DateTime<Utc>) -> FactResult<BTreeSet<CampaignId>>;

    /// Campaigns in the privacy state
    fn campaigns_with_privacy_state(&self, state: PrivacyState) -> FactResult<BTreeSet<CampaignId>>;

    /// Campaigns in the running state
    fn campaigns_with_running_state(&self, state: RunningState) -> FactResult<BTreeSet<CampaignId>>;

    /// Campaigns where the user holds the role
    fn campaigns_where_user_has_role(&self, user: &str, role: Role) -> FactResult<BTreeSet<CampaignId>>;

    /// Every campaign the user belongs to in any role
    fn all_campaigns_for_user(&self, user: &str) -> FactResult<BTreeSet<CampaignId>>;

    /// Classes in which the user is privileged
    fn classes_where_user_privileged(&self, user: &str) -> FactResult<BTreeSet<ClassId>>;

    /// Members of the campaign with their role sets
    fn users_in_campaign(&self, campaign: &str) -> FactResult<BTreeMap<UserId, RoleSet>>;

    /// Whether the user is a system administrator
    fn user_is_admin(&self, user: &str) -> FactResult<bool>;

    /// Whether the user may create campaigns
    fn user_can_create_campaigns(&self, user: &str) -> FactResult<bool>;
}
