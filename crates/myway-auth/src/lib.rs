//! # MyWay Auth
//!
//! Authentication and authorization primitives for the MyWay API.
//!
//! - [`roles`]: the organization role enum (`STUDENT`, `TEACHER`, `ORGANIZER`)
//! - [`claims`]: access and refresh token claim structures
//! - [`jwt`]: token creation and verification
//! - [`gate`]: the pure, org-scoped authorization decision
//!
//! Access tokens carry the user's organization memberships as of issuance.
//! Request handlers still resolve roles from the database for the org that
//! owns the target resource, and feed those memberships to [`gate::authorize`].
//!
//! # Example
//!
//! ```ignore
//! use myway_auth::{MembershipClaim, OrgRole, authorize, create_access_token, verify_token};
//!
//! let token = create_access_token(user_id, "user@example.com", memberships, &config)?;
//! let claims = verify_token(&token, &config)?;
//! authorize(&claims.org_memberships, &[OrgRole::Teacher], Some(org_id))
//!     .map_err(|denial| denial.into_app_error())?;
//! ```

pub mod claims;
pub mod gate;
pub mod jwt;
pub mod roles;

pub use claims::{Claims, MembershipClaim, RefreshTokenClaims};
pub use gate::{GateDenial, authorize};
pub use jwt::{create_access_token, create_refresh_token, verify_refresh_token, verify_token};
pub use roles::OrgRole;
