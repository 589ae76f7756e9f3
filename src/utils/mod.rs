//! Shared helpers for the request layer.
//!
//! - [`auth_helpers`]: org-scoped role checks and resource-to-organization
//!   resolution
//! - [`progress`]: learning activity events used by analytics

pub mod auth_helpers;
pub mod progress;
