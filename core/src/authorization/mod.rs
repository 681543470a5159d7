//! Campaign authorization
//!
//! [`policy`] holds one pure rule per protected operation; [`Authorizer`]
//! fetches the facts those rules need from a [`FactProvider`](crate::facts::FactProvider)
//! and reports denials as `InsufficientPermissions` errors.

pub mod policy;
mod engine;

pub use engine::Authorizer;
pub use policy::{Decision, Denial, ResponseVisibility};
