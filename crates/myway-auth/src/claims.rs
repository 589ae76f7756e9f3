//! JWT claim structures.
//!
//! - [`Claims`]: access token claims, including organization memberships
//! - [`RefreshTokenClaims`]: refresh token claims for token renewal

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::roles::OrgRole;

/// One organization membership embedded in an access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct MembershipClaim {
    pub org_id: Uuid,
    pub role: OrgRole,
}

/// JWT claims for access tokens.
///
/// `org_memberships` is a snapshot taken at login or refresh. It can go
/// stale when a role changes, so authorization decisions reload
/// memberships from the database instead of trusting this list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// User ID (subject claim)
    pub sub: String,
    pub email: String,
    pub org_memberships: Vec<MembershipClaim>,
    /// Expiration (Unix timestamp)
    pub exp: usize,
    /// Issued-at (Unix timestamp)
    pub iat: usize,
}

impl Claims {
    /// Role held in `org_id` at issuance time, if any.
    pub fn role_in(&self, org_id: Uuid) -> Option<OrgRole> {
        self.org_memberships
            .iter()
            .find(|m| m.org_id == org_id)
            .map(|m| m.role)
    }
}

/// JWT claims for refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
    pub iat: usize,
    /// Unique token identifier, so two refresh tokens issued in the same
    /// second still differ.
    pub jti: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_serialize_memberships_snake_case() {
        let org_id = Uuid::new_v4();
        let claims = Claims {
            sub: "user-id-123".to_string(),
            email: "test@example.com".to_string(),
            org_memberships: vec![MembershipClaim {
                org_id,
                role: OrgRole::Organizer,
            }],
            exp: 1234567890,
            iat: 1234567800,
        };
        let serialized = serde_json::to_string(&claims).unwrap();
        assert!(serialized.contains(r#""org_memberships":[{"org_id""#));
        assert!(serialized.contains(r#""role":"ORGANIZER""#));
    }

    #[test]
    fn test_claims_deserialize() {
        let json = r#"{"sub":"user-id-456","email":"user@test.com","org_memberships":[],"exp":9999999999,"iat":9999999900}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.sub, "user-id-456");
        assert!(claims.org_memberships.is_empty());
        assert_eq!(claims.exp, 9999999999);
    }

    #[test]
    fn test_role_in() {
        let org_a = Uuid::new_v4();
        let org_b = Uuid::new_v4();
        let claims = Claims {
            sub: "u".to_string(),
            email: "u@test.com".to_string(),
            org_memberships: vec![
                MembershipClaim {
                    org_id: org_a,
                    role: OrgRole::Student,
                },
                MembershipClaim {
                    org_id: org_b,
                    role: OrgRole::Teacher,
                },
            ],
            exp: 1,
            iat: 0,
        };
        assert_eq!(claims.role_in(org_a), Some(OrgRole::Student));
        assert_eq!(claims.role_in(org_b), Some(OrgRole::Teacher));
        assert_eq!(claims.role_in(Uuid::new_v4()), None);
    }
}
