//! Authorization queries
//!
//! An [`AuthorizationQuery`] is the per-request description of what a
//! requester wants to do. It is built by the request layer and handed to
//! [`crate::authorization::Authorizer::authorize`]; it is never persisted.

use serde::{Serialize, Deserialize};

use super::{CampaignId, RoleSet, UserId};

/// Protected campaign operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// Read campaign metadata
    ReadCampaign,

    /// Read survey responses, optionally those of one target user
    ViewSurveyResponses,

    /// Update campaign metadata
    UpdateCampaign,

    /// Replace the campaign's XML definition
    UpdateCampaignXml,

    /// Grant or revoke the given roles
    GrantOrRevokeRoles {
        /// Roles being granted or revoked
        roles: RoleSet,
    },

    /// Delete the campaign
    DeleteCampaign,

    /// Read the members and their roles
    ReadUsers,

    /// Read the associated classes
    ReadClasses,

    /// Read the personal information of every member
    ReadUsersPersonalInfo,
}

/// One authorization request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationQuery {
    /// Who is asking
    pub requester: UserId,

    /// Campaigns the operation applies to
    pub campaign_ids: Vec<CampaignId>,

    /// User whose data is targeted, `None` for any user in scope
    #[serde(default)]
    pub target_user: Option<UserId>,

    /// What the requester wants to do
    pub operation: Operation,
}

impl AuthorizationQuery {
    /// Create a query for a single campaign
    pub fn new(requester: impl Into<UserId>, campaign_id: impl Into<CampaignId>, operation: Operation) -> Self {
        AuthorizationQuery {
            requester: requester.into(),
            campaign_ids: vec![campaign_id.into()],
            target_user: None,
            operation,
        }
    }

    /// Target a specific user
    pub fn targeting(mut self, user: impl Into<UserId>) -> Self {
        self.target_user = Some(user.into());
        self
    }
}
