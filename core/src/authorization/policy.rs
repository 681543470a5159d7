//! Pure campaign policy rules
//!
//! One function per protected operation, evaluated against facts that have
//! already been fetched. Nothing here performs I/O; the
//! [`Authorizer`](super::Authorizer) decides which facts to fetch and in
//! which order.

use crate::error::{insufficient_permissions, CoreError, ErrorCode, Result};
use crate::models::{PrivacyState, Role, RoleSet, RunningState};

/// Outcome of a policy rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The operation may proceed
    Allow,

    /// The operation is refused
    Deny(Denial),
}

/// Why a rule refused an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    /// Machine-readable code
    pub code: ErrorCode,

    /// Message naming the failed rule
    pub message: String,
}

impl Decision {
    fn deny(code: ErrorCode, message: impl Into<String>) -> Self {
        Decision::Deny(Denial { code, message: message.into() })
    }

    fn campaign_denial(message: impl Into<String>) -> Self {
        Decision::deny(ErrorCode::CampaignInsufficientPermissions, message)
    }

    /// Whether the rule allowed the operation
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Turn a denial into an `InsufficientPermissions` error
    pub fn into_result(self) -> Result<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(denial) => Err(CoreError::from(denial)),
        }
    }
}

impl From<Denial> for CoreError {
    fn from(denial: Denial) -> Self {
        insufficient_permissions(denial.code, denial.message)
    }
}

/// Shown when responses already exist and the campaign definition is frozen
pub const XML_RESPONSES_EXIST: &str = "Survey responses exist; therefore the XML can no longer be modified.";

/// Shown when responses already exist and an author tries to delete
pub const DELETE_RESPONSES_EXIST: &str = "The campaign has responses; therefore, you can no longer delete it.";

/// Shown when the response visibility rules all fail
pub const VIEW_RESPONSES_DENIED: &str =
    "The user does not have sufficient permissions to read information about other users.";

const MANAGERS: [Role; 2] = [Role::Supervisor, Role::Author];

/// Everything the response visibility rule depends on
///
/// The state facts are optional: the engine leaves a state unset when the
/// sub-rule that reads it cannot change the outcome, and a campaign with no
/// recorded state also reads as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseVisibility {
    /// Requester's roles in the campaign
    pub roles: RoleSet,

    /// Campaign privacy state
    pub privacy_state: Option<PrivacyState>,

    /// Campaign running state
    pub running_state: Option<RunningState>,

    /// Whether the requester is the user whose responses are read
    pub requester_is_target: bool,
}

/// Supervisors and authors read every response
pub fn manages_responses(roles: &RoleSet) -> bool {
    roles.contains_any(&MANAGERS)
}

/// Analysts read responses of shared campaigns
pub fn analyst_reads_shared(roles: &RoleSet, privacy_state: Option<PrivacyState>) -> bool {
    roles.contains(Role::Analyst) && privacy_state == Some(PrivacyState::Shared)
}

/// Users read their own responses while the campaign runs
pub fn reads_own_while_running(requester_is_target: bool, running_state: Option<RunningState>) -> bool {
    requester_is_target && running_state == Some(RunningState::Running)
}

impl ResponseVisibility {
    /// Visibility facts for the requester's roles, states not yet fetched
    pub fn new(roles: RoleSet, requester_is_target: bool) -> Self {
        ResponseVisibility { roles, privacy_state: None, running_state: None, requester_is_target }
    }

    /// Whether the privacy state can still change the outcome
    pub fn needs_privacy_state(&self) -> bool {
        !manages_responses(&self.roles) && self.roles.contains(Role::Analyst)
    }

    /// Whether the running state can still change the outcome
    pub fn needs_running_state(&self) -> bool {
        self.requester_is_target
            && !manages_responses(&self.roles)
            && !analyst_reads_shared(&self.roles, self.privacy_state)
    }
}

/// Allowed when any of the response visibility sub-rules holds
pub fn can_view_survey_responses(facts: &ResponseVisibility) -> Decision {
    if manages_responses(&facts.roles)
        || analyst_reads_shared(&facts.roles, facts.privacy_state)
        || reads_own_while_running(facts.requester_is_target, facts.running_state)
    {
        Decision::Allow
    } else {
        Decision::campaign_denial(VIEW_RESPONSES_DENIED)
    }
}

/// Any role is enough to read campaign metadata
pub fn can_read_campaign(roles: &RoleSet, campaign: &str) -> Decision {
    if roles.is_empty() {
        Decision::campaign_denial(format!("The user does not belong to the campaign: {}", campaign))
    } else {
        Decision::Allow
    }
}

/// Supervisors and authors update campaign metadata
pub fn can_update_campaign(roles: &RoleSet) -> Decision {
    if roles.contains_any(&MANAGERS) {
        Decision::Allow
    } else {
        Decision::campaign_denial("The user is not allowed to update the campaign.")
    }
}

/// Supervisors and authors replace the XML until the first response arrives
pub fn can_update_campaign_xml(roles: &RoleSet, response_count: u64) -> Decision {
    if !roles.contains_any(&MANAGERS) {
        return Decision::campaign_denial("The user is not allowed to modify the campaign's XML.");
    }
    if response_count > 0 {
        return Decision::campaign_denial(XML_RESPONSES_EXIST);
    }
    Decision::Allow
}

/// Supervisors grant anything, authors anything but supervisor
pub fn can_grant_or_revoke(roles: &RoleSet, target_roles: &RoleSet) -> Decision {
    if roles.contains(Role::Supervisor) {
        return Decision::Allow;
    }
    if roles.contains(Role::Author) {
        if target_roles.contains(Role::Supervisor) {
            return Decision::campaign_denial("The user is not allowed to grant the supervisor privilege.");
        }
        return Decision::Allow;
    }
    Decision::campaign_denial("The user is not allowed to grant privileges.")
}

/// Supervisors delete, authors only before the first response
///
/// `response_count` is only consulted for authors, so callers may pass a
/// lazily fetched value.
pub fn can_delete_campaign<F>(roles: &RoleSet, response_count: F) -> Result<Decision>
where
    F: FnOnce() -> Result<u64>,
{
    if roles.contains(Role::Supervisor) {
        return Ok(Decision::Allow);
    }
    if roles.contains(Role::Author) {
        return Ok(if response_count()? == 0 {
            Decision::Allow
        } else {
            Decision::campaign_denial(DELETE_RESPONSES_EXIST)
        });
    }
    Ok(Decision::campaign_denial("You do not have sufficient permissions to delete this campaign."))
}

/// Supervisors and authors list members and their roles
pub fn can_read_users(roles: &RoleSet, campaign: &str) -> Decision {
    if roles.contains_any(&MANAGERS) {
        Decision::Allow
    } else {
        Decision::campaign_denial(format!(
            "The user doesn't have sufficient permissions to read the users and their roles for a campaign: {}",
            campaign
        ))
    }
}

/// Supervisors and authors list associated classes
pub fn can_read_classes(roles: &RoleSet, campaign: &str) -> Decision {
    if roles.contains_any(&MANAGERS) {
        Decision::Allow
    } else {
        Decision::campaign_denial(format!(
            "The user doesn't have sufficient permissions to read the classes for a campaign: {}",
            campaign
        ))
    }
}

/// Only supervisors read members' personal information
pub fn can_read_users_personal_info(roles: &RoleSet, campaign: &str) -> Decision {
    if roles.contains(Role::Supervisor) {
        Decision::Allow
    } else {
        Decision::campaign_denial(format!(
            "The user is not allowed to read the personal information of the users in the following campaign: {}",
            campaign
        ))
    }
}

/// At least one of the allowed roles must be held
pub fn has_allowed_role(roles: &RoleSet, allowed: &[Role]) -> Decision {
    if roles.contains_any(allowed) {
        Decision::Allow
    } else {
        Decision::campaign_denial("User does not have a correct role to perform the operation.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn roles(list: &[Role]) -> RoleSet {
        list.iter().copied().collect()
    }

    fn message(decision: Decision) -> String {
        match decision {
            Decision::Deny(denial) => denial.message,
            Decision::Allow => panic!("Expected a denial"),
        }
    }

    #[rstest]
    #[case(&[Role::Supervisor], true)]
    #[case(&[Role::Author], true)]
    #[case(&[Role::Analyst], false)]
    #[case(&[Role::Participant], false)]
    #[case(&[], false)]
    fn test_update_campaign(#[case] held: &[Role], #[case] allowed: bool) {
        assert_eq!(can_update_campaign(&roles(held)).is_allowed(), allowed);
    }

    #[test]
    fn test_author_cannot_grant_supervisor() {
        let author = roles(&[Role::Author]);

        let decision = can_grant_or_revoke(&author, &roles(&[Role::Supervisor, Role::Analyst]));
        assert_eq!(message(decision), "The user is not allowed to grant the supervisor privilege.");

        assert!(can_grant_or_revoke(&author, &roles(&[Role::Analyst, Role::Participant])).is_allowed());
        assert!(can_grant_or_revoke(&roles(&[Role::Supervisor]), &roles(&[Role::Supervisor])).is_allowed());
        assert_eq!(
            message(can_grant_or_revoke(&roles(&[Role::Analyst]), &roles(&[Role::Participant]))),
            "The user is not allowed to grant privileges."
        );
    }

    #[test]
    fn test_xml_update_gate() {
        let author = roles(&[Role::Author]);

        assert!(can_update_campaign_xml(&author, 0).is_allowed());
        assert_eq!(message(can_update_campaign_xml(&author, 4)), XML_RESPONSES_EXIST);
        assert_eq!(
            message(can_update_campaign_xml(&roles(&[Role::Analyst]), 0)),
            "The user is not allowed to modify the campaign's XML."
        );
    }

    #[test]
    fn test_delete_gate() {
        let author = roles(&[Role::Author]);

        assert!(can_delete_campaign(&author, || Ok(0)).unwrap().is_allowed());
        assert_eq!(message(can_delete_campaign(&author, || Ok(1)).unwrap()), DELETE_RESPONSES_EXIST);

        // supervisors never need the response count
        let supervisor = roles(&[Role::Supervisor]);
        let decision = can_delete_campaign(&supervisor, || panic!("response count fetched")).unwrap();
        assert!(decision.is_allowed());

        assert_eq!(
            message(can_delete_campaign(&roles(&[Role::Participant]), || Ok(0)).unwrap()),
            "You do not have sufficient permissions to delete this campaign."
        );
    }

    #[test]
    fn test_personal_info_requires_supervisor() {
        assert!(can_read_users_personal_info(&roles(&[Role::Supervisor]), "c").is_allowed());
        assert!(!can_read_users_personal_info(&roles(&[Role::Author]), "c").is_allowed());
        assert!(can_read_users(&roles(&[Role::Author]), "c").is_allowed());
        assert!(can_read_classes(&roles(&[Role::Author]), "c").is_allowed());
        assert!(!can_read_classes(&roles(&[Role::Analyst]), "c").is_allowed());
    }

    #[test]
    fn test_denial_converts_to_error() {
        let err = can_update_campaign(&RoleSet::new()).into_result().unwrap_err();
        assert_eq!(err.code(), ErrorCode::CampaignInsufficientPermissions);
        assert!(err.is_client_error());
    }

    fn role_set_strategy() -> impl Strategy<Value = RoleSet> {
        proptest::collection::vec(proptest::sample::select(Role::ALL.to_vec()), 0..4)
            .prop_map(|list| list.into_iter().collect())
    }

    fn visibility_strategy() -> impl Strategy<Value = ResponseVisibility> {
        (
            role_set_strategy(),
            proptest::option::of(prop_oneof![Just(PrivacyState::Shared), Just(PrivacyState::Private)]),
            proptest::option::of(prop_oneof![Just(RunningState::Running), Just(RunningState::Stopped)]),
            any::<bool>(),
        )
            .prop_map(|(roles, privacy_state, running_state, requester_is_target)| ResponseVisibility {
                roles,
                privacy_state,
                running_state,
                requester_is_target,
            })
    }

    fn sub_rules(facts: &ResponseVisibility) -> (bool, bool, bool) {
        (
            manages_responses(&facts.roles),
            analyst_reads_shared(&facts.roles, facts.privacy_state),
            reads_own_while_running(facts.requester_is_target, facts.running_state),
        )
    }

    proptest! {
        #[test]
        fn prop_visibility_is_exactly_the_sub_rules(facts in visibility_strategy()) {
            let supervisor_or_author =
                facts.roles.contains(Role::Supervisor) || facts.roles.contains(Role::Author);
            let analyst_shared =
                facts.roles.contains(Role::Analyst) && facts.privacy_state == Some(PrivacyState::Shared);
            let self_running =
                facts.requester_is_target && facts.running_state == Some(RunningState::Running);

            prop_assert_eq!(
                can_view_survey_responses(&facts).is_allowed(),
                supervisor_or_author || analyst_shared || self_running
            );
        }

        #[test]
        fn prop_toggling_privacy_only_moves_the_analyst_rule(facts in visibility_strategy()) {
            let mut toggled = facts.clone();
            toggled.privacy_state = facts.privacy_state.map(|state| match state {
                PrivacyState::Shared => PrivacyState::Private,
                PrivacyState::Private => PrivacyState::Shared,
            });

            let (m1, a1, s1) = sub_rules(&facts);
            let (m2, a2, s2) = sub_rules(&toggled);
            prop_assert_eq!((m1, s1), (m2, s2));

            let before = can_view_survey_responses(&facts).is_allowed();
            let after = can_view_survey_responses(&toggled).is_allowed();
            if before != after {
                prop_assert_ne!(a1, a2);
            }
        }

        #[test]
        fn prop_toggling_running_state_only_moves_the_self_rule(facts in visibility_strategy()) {
            let mut toggled = facts.clone();
            toggled.running_state = facts.running_state.map(|state| match state {
                RunningState::Running => RunningState::Stopped,
                RunningState::Stopped => RunningState::Running,
            });

            let (m1, a1, s1) = sub_rules(&facts);
            let (m2, a2, s2) = sub_rules(&toggled);
            prop_assert_eq!((m1, a1), (m2, a2));

            if can_view_survey_responses(&facts) != can_view_survey_responses(&toggled) {
                prop_assert_ne!(s1, s2);
            }
        }

        #[test]
        fn prop_toggling_identity_only_moves_the_self_rule(facts in visibility_strategy()) {
            let mut toggled = facts.clone();
            toggled.requester_is_target = !facts.requester_is_target;

            let (m1, a1, s1) = sub_rules(&facts);
            let (m2, a2, s2) = sub_rules(&toggled);
            prop_assert_eq!((m1, a1), (m2, a2));

            if can_view_survey_responses(&facts) != can_view_survey_responses(&toggled) {
                prop_assert_ne!(s1, s2);
            }
        }

        #[test]
        fn prop_toggling_a_role_only_moves_role_rules(facts in visibility_strategy(), role in proptest::sample::select(Role::ALL.to_vec())) {
            let mut toggled = facts.clone();
            toggled.roles = if facts.roles.contains(role) {
                facts.roles.iter().filter(|held| *held != role).collect()
            } else {
                facts.roles.iter().chain(std::iter::once(role)).collect()
            };

            let (m1, a1, s1) = sub_rules(&facts);
            let (m2, a2, s2) = sub_rules(&toggled);
            prop_assert_eq!(s1, s2);

            if can_view_survey_responses(&facts) != can_view_survey_responses(&toggled) {
                prop_assert!(m1 != m2 || a1 != a2);
            }
        }

        #[test]
        fn prop_skipped_states_never_change_the_decision(facts in visibility_strategy()) {
            let mut trimmed = facts.clone();
            if !facts.needs_privacy_state() {
                trimmed.privacy_state = None;
            }
            if !trimmed.needs_running_state() {
                trimmed.running_state = None;
            }
            prop_assert_eq!(can_view_survey_responses(&facts), can_view_survey_responses(&trimmed));
        }
    }
}
