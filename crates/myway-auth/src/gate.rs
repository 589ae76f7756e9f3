//! Organization-scoped authorization decision.
//!
//! [`authorize`] is a pure function: it only looks at the memberships it is
//! handed. Callers decide where those memberships come from (the request
//! handlers load them fresh from the database for the target organization).

use std::fmt;

use myway_core::AppError;
use uuid::Uuid;

use crate::claims::MembershipClaim;
use crate::roles::OrgRole;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDenial {
    /// No membership in the organization that owns the resource.
    NotAMember,
    /// A membership exists but its role is not in the required set.
    InsufficientRole {
        required: Vec<OrgRole>,
        actual: OrgRole,
    },
}

impl fmt::Display for GateDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateDenial::NotAMember => {
                write!(f, "Access denied. You are not a member of this organization")
            }
            GateDenial::InsufficientRole { required, actual } => {
                let required = required
                    .iter()
                    .map(OrgRole::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(
                    f,
                    "Access denied. Required role: {}, but you are {}",
                    required, actual
                )
            }
        }
    }
}

impl GateDenial {
    pub fn into_app_error(self) -> AppError {
        AppError::forbidden(self.to_string())
    }
}

/// Decides whether `memberships` satisfy `required_roles` in `target_org`.
///
/// - An empty `required_roles` allows any authenticated caller.
/// - With a target org, only a membership in that org counts. A role held
///   in another organization never grants access.
/// - Without a target org, a matching role in any organization is enough.
pub fn authorize(
    memberships: &[MembershipClaim],
    required_roles: &[OrgRole],
    target_org: Option<Uuid>,
) -> Result<(), GateDenial> {
    if required_roles.is_empty() {
        return Ok(());
    }

    match target_org {
        Some(org_id) => {
            let membership = memberships
                .iter()
                .find(|m| m.org_id == org_id)
                .ok_or(GateDenial::NotAMember)?;

            if required_roles.contains(&membership.role) {
                Ok(())
            } else {
                Err(GateDenial::InsufficientRole {
                    required: required_roles.to_vec(),
                    actual: membership.role,
                })
            }
        }
        None => {
            let first = memberships.first().ok_or(GateDenial::NotAMember)?;
            if memberships.iter().any(|m| required_roles.contains(&m.role)) {
                Ok(())
            } else {
                Err(GateDenial::InsufficientRole {
                    required: required_roles.to_vec(),
                    actual: first.role,
                })
            }
        }
    }
}
