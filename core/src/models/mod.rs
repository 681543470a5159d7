//! Data models for campaigns, roles and authorization queries
//!
//! Roles and campaign states are closed enumerations; identifiers are plain
//! strings as handed over by the request layer.

mod role;
mod campaign;
mod query;

pub use role::{Role, RoleSet};
pub use campaign::{CampaignState, PrivacyState, RunningState};
pub use query::{AuthorizationQuery, Operation};

/// Unique identifier of a user (the login name)
pub type UserId = String;

/// Unique identifier of a campaign (its URN)
pub type CampaignId = String;

/// Unique identifier of a class
pub type ClassId = String;
