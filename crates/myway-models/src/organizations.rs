//! Organizations and their memberships.

use chrono::{DateTime, Utc};
use myway_auth::OrgRole;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{OrgId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Organization {
    pub id: OrgId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An organization seen from one member, with that member's role.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OrganizationWithRole {
    pub id: OrgId,
    pub name: String,
    pub role: OrgRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    pub user_id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: OrgRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrganizationDto {
    #[validate(length(min = 1, max = 255, message = "name must be between 1 and 255 characters"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddMemberDto {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[serde(default = "default_member_role")]
    pub role: OrgRole,
}

fn default_member_role() -> OrgRole {
    OrgRole::Student
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateMemberRoleDto {
    pub role: OrgRole,
}
