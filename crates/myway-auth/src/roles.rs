use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role a user holds inside one organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "org_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrgRole {
    Student,
    Teacher,
    Organizer,
}

impl OrgRole {
    /// Any membership at all.
    pub const ANY: [OrgRole; 3] = [OrgRole::Student, OrgRole::Teacher, OrgRole::Organizer];
    /// Roles allowed to author course content and grade.
    pub const STAFF: [OrgRole; 2] = [OrgRole::Teacher, OrgRole::Organizer];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrgRole::Student => "STUDENT",
            OrgRole::Teacher => "TEACHER",
            OrgRole::Organizer => "ORGANIZER",
        }
    }
}

impl std::fmt::Display for OrgRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrgRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "STUDENT" => Ok(OrgRole::Student),
            "TEACHER" => Ok(OrgRole::Teacher),
            "ORGANIZER" => Ok(OrgRole::Organizer),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}
