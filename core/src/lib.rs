//! # ohmage core
//!
//! Authorization and survey response projection for ohmage campaigns.
//!
//! The crate answers two questions. Whether a requester may perform an
//! operation on a campaign, decided by [`Authorizer`] over facts served by a
//! [`FactProvider`]. And how flat survey response rows pivot into the
//! column-oriented [`Document`] the read API returns, done by [`Projector`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod authorization;
pub mod config;
pub mod error;
pub mod facts;
pub mod models;
pub mod projection;
pub mod selection;
pub mod utils;
pub mod validators;

/// Re-export common types for ease of use
pub use authorization::{Authorizer, Decision, Denial};
pub use config::{CoreConfig, ProjectionConfig};
pub use error::{CoreError, DataAccessError, ErrorCode};
pub use facts::{FactProvider, InMemoryFacts};
pub use models::{AuthorizationQuery, CampaignState, Operation, PrivacyState, Role, RoleSet, RunningState};
pub use projection::{Document, ProjectionRequest, Projector, ResultRow};
pub use selection::{CampaignFilter, CampaignRoster, CampaignSelector};

/// Result type for the core crate
pub type Result<T> = std::result::Result<T, error::CoreError>;

/// Version of the core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
