//! Authorization engine
//!
//! Fetches the facts each rule needs, in the order the rule consults them,
//! and turns policy denials into errors. Batch checks stop at the first
//! violation. Nothing is cached between calls.

use std::collections::BTreeSet;
use log::{debug, error, info};

use crate::error::{invalid_argument, insufficient_permissions, unknown_entity, ErrorCode, Result};
use crate::facts::{FactProvider, FactResult};
use crate::models::{AuthorizationQuery, CampaignId, Operation, Role, RoleSet};
use super::policy::{self, Decision, ResponseVisibility};

/// Decides whether requesters may perform protected operations
pub struct Authorizer<'a, F: FactProvider + ?Sized> {
    facts: &'a F,
}

impl<'a, F: FactProvider + ?Sized> Authorizer<'a, F> {
    /// Create an authorizer over the facts
    pub fn new(facts: &'a F) -> Self {
        Authorizer { facts }
    }

    fn fetch<T>(&self, what: &str, result: FactResult<T>) -> Result<T> {
        result.map_err(|err| {
            error!("Fact lookup '{}' failed: {}", what, err);
            err.into()
        })
    }

    fn roles(&self, user: &str, campaign: &str) -> Result<RoleSet> {
        self.fetch("roles_of", self.facts.roles_of(user, campaign))
    }

    fn enforce(&self, user: &str, campaign: &str, decision: Decision) -> Result<()> {
        if let Decision::Deny(denial) = &decision {
            info!("Denied {} on {}: {}", user, campaign, denial.message);
        }
        decision.into_result()
    }

    /// Run the rule matching the query against every campaign it names
    pub fn authorize(&self, query: &AuthorizationQuery) -> Result<()> {
        if query.campaign_ids.is_empty() {
            return Err(invalid_argument(
                ErrorCode::CampaignInvalidId,
                "At least one campaign id is required.",
            ));
        }
        debug!("Authorizing {:?} for {}", query.operation, query.requester);

        let requester = query.requester.as_str();
        for campaign in &query.campaign_ids {
            match &query.operation {
                Operation::ReadCampaign => self.campaign_exists_and_user_belongs(campaign, requester)?,
                Operation::ViewSurveyResponses => {
                    self.requester_can_view_users_survey_responses(campaign, requester, query.target_user.as_deref())?
                }
                Operation::UpdateCampaign => self.verify_user_can_update_campaign(requester, campaign)?,
                Operation::UpdateCampaignXml => self.verify_user_can_update_campaign_xml(requester, campaign)?,
                Operation::GrantOrRevokeRoles { roles } => {
                    self.verify_user_can_grant_or_revoke_roles(requester, campaign, roles)?
                }
                Operation::DeleteCampaign => self.verify_user_can_delete_campaign(requester, campaign)?,
                Operation::ReadUsers => self.verify_user_can_read_users_in_campaign(requester, campaign)?,
                Operation::ReadClasses => self.verify_user_can_read_classes_of_campaign(requester, campaign)?,
                Operation::ReadUsersPersonalInfo => {
                    self.verify_user_can_read_users_info_in_campaign(requester, campaign)?
                }
            }
        }
        Ok(())
    }

    /// The campaign must exist and the user must hold a role in it
    pub fn campaign_exists_and_user_belongs(&self, campaign: &str, user: &str) -> Result<()> {
        if !self.fetch("campaign_exists", self.facts.campaign_exists(campaign))? {
            return Err(unknown_entity(
                ErrorCode::CampaignInvalidId,
                format!("The campaign does not exist: {}", campaign),
            ));
        }
        let roles = self.roles(user, campaign)?;
        self.enforce(user, campaign, policy::can_read_campaign(&roles, campaign))
    }

    /// Batch form of [`Self::campaign_exists_and_user_belongs`]
    pub fn campaigns_exist_and_user_belongs<S: AsRef<str>>(&self, campaigns: &[S], user: &str) -> Result<()> {
        for campaign in campaigns {
            self.campaign_exists_and_user_belongs(campaign.as_ref(), user)?;
        }
        Ok(())
    }

    /// Campaign metadata is readable by every member
    pub fn verify_user_can_read_campaign(&self, user: &str, campaign: &str) -> Result<()> {
        self.campaign_exists_and_user_belongs(campaign, user)
    }

    /// Whether the requester may read survey responses in the campaign
    ///
    /// `target` is the user whose responses are requested, `None` meaning
    /// any user. State facts are only fetched when a role-based rule has not
    /// already allowed the read.
    pub fn requester_can_view_users_survey_responses(
        &self,
        campaign: &str,
        requester: &str,
        target: Option<&str>,
    ) -> Result<()> {
        let roles = self.roles(requester, campaign)?;
        let mut visibility = ResponseVisibility::new(roles, target == Some(requester));
        if visibility.needs_privacy_state() {
            visibility.privacy_state = self.fetch(
                "campaign_privacy_state",
                self.facts.campaign_privacy_state(campaign),
            )?;
        }
        if visibility.needs_running_state() {
            visibility.running_state = self.fetch(
                "campaign_running_state",
                self.facts.campaign_running_state(campaign),
            )?;
        }
        self.enforce(requester, campaign, policy::can_view_survey_responses(&visibility))
    }

    /// Supervisors and authors may update the campaign
    pub fn verify_user_can_update_campaign(&self, user: &str, campaign: &str) -> Result<()> {
        let roles = self.roles(user, campaign)?;
        self.enforce(user, campaign, policy::can_update_campaign(&roles))
    }

    /// Supervisors and authors may replace the XML while no responses exist
    pub fn verify_user_can_update_campaign_xml(&self, user: &str, campaign: &str) -> Result<()> {
        let roles = self.roles(user, campaign)?;
        let response_count = if policy::manages_responses(&roles) {
            self.fetch(
                "response_count_for_campaign",
                self.facts.response_count_for_campaign(campaign),
            )?
        } else {
            0
        };
        self.enforce(user, campaign, policy::can_update_campaign_xml(&roles, response_count))
    }

    /// Whether the user may grant or revoke `target_roles`
    pub fn verify_user_can_grant_or_revoke_roles(
        &self,
        user: &str,
        campaign: &str,
        target_roles: &RoleSet,
    ) -> Result<()> {
        let roles = self.roles(user, campaign)?;
        self.enforce(user, campaign, policy::can_grant_or_revoke(&roles, target_roles))
    }

    /// Supervisors may delete, authors only while no responses exist
    pub fn verify_user_can_delete_campaign(&self, user: &str, campaign: &str) -> Result<()> {
        let roles = self.roles(user, campaign)?;
        let decision = policy::can_delete_campaign(&roles, || {
            self.fetch(
                "response_count_for_campaign",
                self.facts.response_count_for_campaign(campaign),
            )
        })?;
        self.enforce(user, campaign, decision)
    }

    /// Supervisors and authors may list members and roles
    pub fn verify_user_can_read_users_in_campaign(&self, user: &str, campaign: &str) -> Result<()> {
        let roles = self.roles(user, campaign)?;
        self.enforce(user, campaign, policy::can_read_users(&roles, campaign))
    }

    /// Batch form of [`Self::verify_user_can_read_users_in_campaign`]
    pub fn verify_user_can_read_users_in_campaigns<S: AsRef<str>>(&self, user: &str, campaigns: &[S]) -> Result<()> {
        for campaign in campaigns {
            self.verify_user_can_read_users_in_campaign(user, campaign.as_ref())?;
        }
        Ok(())
    }

    /// Supervisors and authors may list associated classes
    pub fn verify_user_can_read_classes_of_campaign(&self, user: &str, campaign: &str) -> Result<()> {
        let roles = self.roles(user, campaign)?;
        self.enforce(user, campaign, policy::can_read_classes(&roles, campaign))
    }

    /// Batch form of [`Self::verify_user_can_read_classes_of_campaign`]
    pub fn verify_user_can_read_classes_of_campaigns<S: AsRef<str>>(&self, user: &str, campaigns: &[S]) -> Result<()> {
        for campaign in campaigns {
            self.verify_user_can_read_classes_of_campaign(user, campaign.as_ref())?;
        }
        Ok(())
    }

    /// Only supervisors may read every member's personal information
    pub fn verify_user_can_read_users_info_in_campaign(&self, user: &str, campaign: &str) -> Result<()> {
        let roles = self.roles(user, campaign)?;
        self.enforce(user, campaign, policy::can_read_users_personal_info(&roles, campaign))
    }

    /// Batch form of [`Self::verify_user_can_read_users_info_in_campaign`]
    pub fn verify_user_can_read_users_info_in_campaigns<S: AsRef<str>>(&self, user: &str, campaigns: &[S]) -> Result<()> {
        for campaign in campaigns {
            self.verify_user_can_read_users_info_in_campaign(user, campaign.as_ref())?;
        }
        Ok(())
    }

    /// Whether the requester may read the personal information of `targets`
    ///
    /// A lone target equal to the requester is always allowed. Otherwise each
    /// target must share a campaign with the requester where the requester is
    /// a supervisor, and that campaign must also be associated with every
    /// class the requester is privileged in. In a batch, the requester's own
    /// record goes through the same check as everyone else's.
    pub fn verify_user_can_read_users_personal_info<S: AsRef<str>>(&self, requester: &str, targets: &[S]) -> Result<()> {
        match targets {
            [] => return Ok(()),
            [only] if only.as_ref() == requester => return Ok(()),
            _ => {}
        }

        let supervised: BTreeSet<CampaignId> = self.fetch(
            "campaigns_where_user_has_role",
            self.facts.campaigns_where_user_has_role(requester, Role::Supervisor),
        )?;
        let classes = self.fetch(
            "classes_where_user_privileged",
            self.facts.classes_where_user_privileged(requester),
        )?;

        for target in targets {
            let target = target.as_ref();
            let mut shared = self.fetch("all_campaigns_for_user", self.facts.all_campaigns_for_user(target))?;
            shared.retain(|campaign| supervised.contains(campaign));
            for class in &classes {
                if shared.is_empty() {
                    break;
                }
                let of_class = self.fetch(
                    "campaigns_associated_with_class",
                    self.facts.campaigns_associated_with_class(class),
                )?;
                shared.retain(|campaign| of_class.contains(campaign));
            }

            if shared.is_empty() {
                info!("Denied {} reading personal information of {}", requester, target);
                return Err(insufficient_permissions(
                    ErrorCode::UserInsufficientPermissions,
                    format!(
                        "The user is not allowed to view personal information about a user in the list: {}",
                        target
                    ),
                ));
            }
        }
        Ok(())
    }

    /// The user must belong to the campaign with one of the allowed roles
    pub fn verify_allowed_user_role_in_campaign(&self, user: &str, campaign: &str, allowed: &[Role]) -> Result<()> {
        let roles = self.roles(user, campaign)?;
        if roles.is_empty() {
            return Err(unknown_entity(
                ErrorCode::CampaignInvalidId,
                format!("The user does not belong to the campaign: {}", campaign),
            ));
        }
        self.enforce(user, campaign, policy::has_allowed_role(&roles, allowed))
    }

    /// Every listed user must belong to the campaign
    pub fn verify_users_exist_in_campaign<S: AsRef<str>>(&self, campaign: &str, users: &[S]) -> Result<()> {
        if campaign.trim().is_empty() {
            return Err(invalid_argument(ErrorCode::CampaignInvalidId, "A campaign id is required."));
        }
        for user in users {
            let user = user.as_ref();
            if self.roles(user, campaign)?.is_empty() {
                return Err(invalid_argument(
                    ErrorCode::UserNotInCampaign,
                    format!("The user does not belong to the campaign. Username: {} Campaign ID: {}", user, campaign),
                ));
            }
        }
        Ok(())
    }

    /// The user's existence must match `should_exist`
    pub fn check_user_existence(&self, user: &str, should_exist: bool) -> Result<()> {
        let exists = self.fetch("user_exists", self.facts.user_exists(user))?;
        match (exists, should_exist) {
            (true, false) => Err(invalid_argument(
                ErrorCode::UserInvalidUsername,
                format!("The following user already exists: {}", user),
            )),
            (false, true) => Err(unknown_entity(
                ErrorCode::UserInvalidUsername,
                format!("The following user does not exist: {}", user),
            )),
            _ => Ok(()),
        }
    }

    /// Batch form of [`Self::check_user_existence`]
    pub fn verify_users_exist<S: AsRef<str>>(&self, users: &[S], should_exist: bool) -> Result<()> {
        for user in users {
            self.check_user_existence(user.as_ref(), should_exist)?;
        }
        Ok(())
    }

    /// The user must be a system administrator
    pub fn verify_user_is_admin(&self, user: &str) -> Result<()> {
        if self.fetch("user_is_admin", self.facts.user_is_admin(user))? {
            Ok(())
        } else {
            info!("Denied {}: not an admin", user);
            Err(insufficient_permissions(ErrorCode::UserInsufficientPermissions, "The user is not an admin."))
        }
    }

    /// The user must hold the campaign creation privilege
    pub fn verify_user_can_create_campaigns(&self, user: &str) -> Result<()> {
        if self.fetch("user_can_create_campaigns", self.facts.user_can_create_campaigns(user))? {
            Ok(())
        } else {
            info!("Denied {}: may not create campaigns", user);
            Err(insufficient_permissions(
                ErrorCode::CampaignInsufficientPermissions,
                "The user does not have permission to create new campaigns.",
            ))
        }
    }

    /// Self-only operations: the target must be the requester
    pub fn verify_user_is_self(&self, requester: &str, target: Option<&str>) -> Result<()> {
        match target {
            None => Err(invalid_argument(ErrorCode::UserInvalidUsername, "The user ID is missing.")),
            Some(target) if target == requester => Ok(()),
            Some(_) => Err(insufficient_permissions(
                ErrorCode::UserInsufficientPermissions,
                "A user may only view their own information.",
            )),
        }
    }
}
