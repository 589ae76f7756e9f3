//! Users and the authentication request/response bodies.

use chrono::{DateTime, Utc};
use myway_auth::{MembershipClaim, OrgRole};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{OrgId, UserId};

/// Public user record. The password hash never leaves the service layer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Membership as returned to clients, with the organization's name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserMembership {
    pub org_id: OrgId,
    pub org_name: String,
    pub role: OrgRole,
}

impl From<&UserMembership> for MembershipClaim {
    fn from(m: &UserMembership) -> Self {
        MembershipClaim {
            org_id: m.org_id.into_inner(),
            role: m.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserWithMemberships {
    #[serde(flatten)]
    pub user: User,
    pub memberships: Vec<UserMembership>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequestDto {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[serde(alias = "pass")]
    #[validate(length(min = 6, max = 128, message = "password must be between 6 and 128 characters"))]
    pub password: String,
    #[serde(alias = "name")]
    #[validate(length(min = 1, max = 255, message = "display_name is required"))]
    pub display_name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[serde(alias = "pass")]
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "refresh_token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserWithMemberships,
}

/// Lower-cases and trims an email so lookups and the unique index agree.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_dto_accepts_legacy_field_names() {
        let dto: RegisterRequestDto =
            serde_json::from_str(r#"{"email":"a@x.com","pass":"secret1","name":"Ada"}"#).unwrap();
        assert_eq!(dto.password, "secret1");
        assert_eq!(dto.display_name, "Ada");
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_register_dto_validation() {
        let dto = RegisterRequestDto {
            email: "not-an-email".to_string(),
            password: "secret1".to_string(),
            display_name: "Ada".to_string(),
        };
        assert!(dto.validate().is_err());

        let dto = RegisterRequestDto {
            email: "a@x.com".to_string(),
            password: "short".to_string(),
            display_name: "Ada".to_string(),
        };
        assert!(dto.validate().is_err());

        let dto = RegisterRequestDto {
            email: "a@x.com".to_string(),
            password: "secret1".to_string(),
            display_name: "".to_string(),
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
