//! Campaign selection
//!
//! Narrows a set of campaign ids by a conjunction of optional criteria. The
//! base set is either the ids the caller supplied or every campaign the user
//! belongs to; each criterion then contributes its own matching set which is
//! intersected into the running result. Criteria therefore commute and are
//! idempotent. An omitted criterion does not filter, while an explicitly
//! empty collection matches nothing.

use std::collections::{BTreeMap, BTreeSet};
use chrono::{DateTime, Utc};
use log::{debug, error};
use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::facts::{FactProvider, FactResult};
use crate::models::{CampaignId, ClassId, PrivacyState, Role, RoleSet, RunningState, UserId};

/// One narrowing criterion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CampaignCriterion {
    /// Associated with every one of the classes
    Classes(BTreeSet<ClassId>),

    /// Created on or after the instant
    CreatedOnOrAfter(DateTime<Utc>),

    /// Created on or before the instant
    CreatedOnOrBefore(DateTime<Utc>),

    /// In the privacy state
    Privacy(PrivacyState),

    /// In the running state
    Running(RunningState),

    /// The user holds the role
    UserRole(Role),
}

/// Optional filters for a campaign listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignFilter {
    /// Base set; `None` means every campaign the user belongs to
    #[serde(default)]
    pub campaign_ids: Option<BTreeSet<CampaignId>>,

    /// Keep campaigns associated with all of these classes
    #[serde(default)]
    pub class_ids: Option<BTreeSet<ClassId>>,

    /// Keep campaigns created on or after this instant
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,

    /// Keep campaigns created on or before this instant
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,

    /// Keep campaigns in this privacy state
    #[serde(default)]
    pub privacy_state: Option<PrivacyState>,

    /// Keep campaigns in this running state
    #[serde(default)]
    pub running_state: Option<RunningState>,

    /// Keep campaigns where the user holds this role
    #[serde(default)]
    pub role: Option<Role>,
}

impl CampaignFilter {
    /// A filter that selects every campaign of the user
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from explicit campaign ids
    pub fn campaigns<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CampaignId>,
    {
        self.campaign_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Keep campaigns associated with all of the classes
    pub fn classes<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ClassId>,
    {
        self.class_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Keep campaigns created on or after the instant
    pub fn created_on_or_after(mut self, date: DateTime<Utc>) -> Self {
        self.start_date = Some(date);
        self
    }

    /// Keep campaigns created on or before the instant
    pub fn created_on_or_before(mut self, date: DateTime<Utc>) -> Self {
        self.end_date = Some(date);
        self
    }

    /// Keep campaigns in the privacy state
    pub fn privacy(mut self, state: PrivacyState) -> Self {
        self.privacy_state = Some(state);
        self
    }

    /// Keep campaigns in the running state
    pub fn running(mut self, state: RunningState) -> Self {
        self.running_state = Some(state);
        self
    }

    /// Keep campaigns where the user holds the role
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// The criteria this filter applies on top of its base set
    pub fn criteria(&self) -> Vec<CampaignCriterion> {
        let mut criteria = Vec::new();
        if let Some(classes) = &self.class_ids {
            criteria.push(CampaignCriterion::Classes(classes.clone()));
        }
        if let Some(date) = self.start_date {
            criteria.push(CampaignCriterion::CreatedOnOrAfter(date));
        }
        if let Some(date) = self.end_date {
            criteria.push(CampaignCriterion::CreatedOnOrBefore(date));
        }
        if let Some(state) = self.privacy_state {
            criteria.push(CampaignCriterion::Privacy(state));
        }
        if let Some(state) = self.running_state {
            criteria.push(CampaignCriterion::Running(state));
        }
        if let Some(role) = self.role {
            criteria.push(CampaignCriterion::UserRole(role));
        }
        criteria
    }
}

/// Members of one campaign grouped by role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignRoster {
    /// Supervisors
    pub supervisors: BTreeSet<UserId>,

    /// Authors
    pub authors: BTreeSet<UserId>,

    /// Analysts
    pub analysts: BTreeSet<UserId>,

    /// Participants
    pub participants: BTreeSet<UserId>,
}

impl CampaignRoster {
    fn from_members(members: &BTreeMap<UserId, RoleSet>) -> Self {
        let mut roster = CampaignRoster::default();
        for (user, roles) in members {
            for role in roles.iter() {
                let bucket = match role {
                    Role::Supervisor => &mut roster.supervisors,
                    Role::Author => &mut roster.authors,
                    Role::Analyst => &mut roster.analysts,
                    Role::Participant => &mut roster.participants,
                };
                bucket.insert(user.clone());
            }
        }
        roster
    }
}

/// Set-intersection campaign filter over a fact provider
pub struct CampaignSelector<'a, F: FactProvider + ?Sized> {
    facts: &'a F,
}

impl<'a, F: FactProvider + ?Sized> CampaignSelector<'a, F> {
    /// Create a selector over the facts
    pub fn new(facts: &'a F) -> Self {
        CampaignSelector { facts }
    }

    /// Campaign ids matching the filter for the user
    pub fn select(&self, user: &str, filter: &CampaignFilter) -> Result<BTreeSet<CampaignId>> {
        self.select_with(user, filter.campaign_ids.as_ref(), &filter.criteria())
    }

    /// Campaign ids in `base` (or all of the user's) matching every criterion
    pub fn select_with(
        &self,
        user: &str,
        base: Option<&BTreeSet<CampaignId>>,
        criteria: &[CampaignCriterion],
    ) -> Result<BTreeSet<CampaignId>> {
        let mut selected = match base {
            Some(ids) => ids.clone(),
            None => fetch(self.facts.all_campaigns_for_user(user))?,
        };

        for criterion in criteria {
            if selected.is_empty() {
                break;
            }
            let matching = self.matching(user, criterion)?;
            selected.retain(|id| matching.contains(id));
        }

        debug!("Selected {} campaigns for {}", selected.len(), user);
        Ok(selected)
    }

    fn matching(&self, user: &str, criterion: &CampaignCriterion) -> Result<BTreeSet<CampaignId>> {
        match criterion {
            CampaignCriterion::Classes(classes) => {
                let mut classes = classes.iter();
                let Some(first) = classes.next() else {
                    return Ok(BTreeSet::new());
                };
                let mut matching = fetch(self.facts.campaigns_associated_with_class(first))?;
                for class in classes {
                    if matching.is_empty() {
                        break;
                    }
                    let of_class = fetch(self.facts.campaigns_associated_with_class(class))?;
                    matching.retain(|id| of_class.contains(id));
                }
                Ok(matching)
            }
            CampaignCriterion::CreatedOnOrAfter(date) => fetch(self.facts.campaigns_on_or_after(*date)),
            CampaignCriterion::CreatedOnOrBefore(date) => fetch(self.facts.campaigns_on_or_before(*date)),
            CampaignCriterion::Privacy(state) => fetch(self.facts.campaigns_with_privacy_state(*state)),
            CampaignCriterion::Running(state) => fetch(self.facts.campaigns_with_running_state(*state)),
            CampaignCriterion::UserRole(role) => fetch(self.facts.campaigns_where_user_has_role(user, *role)),
        }
    }

    /// Distinct members across the campaigns
    pub fn users_in_campaigns<S: AsRef<str>>(&self, campaigns: &[S]) -> Result<BTreeSet<UserId>> {
        let mut users = BTreeSet::new();
        for campaign in campaigns {
            users.extend(fetch(self.facts.users_in_campaign(campaign.as_ref()))?.into_keys());
        }
        Ok(users)
    }

    /// Members of the campaign grouped by role
    pub fn campaign_roster(&self, campaign: &str) -> Result<CampaignRoster> {
        let members = fetch(self.facts.users_in_campaign(campaign))?;
        Ok(CampaignRoster::from_members(&members))
    }
}

fn fetch<T>(result: FactResult<T>) -> Result<T> {
    result.map_err(|err| {
        error!("Fact lookup failed during campaign selection: {}", err);
        err.into()
    })
}
