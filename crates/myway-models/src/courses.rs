//! Courses, their ordered modules, the materials inside each module, and
//! course enrollments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{CourseId, EnrollmentId, MaterialId, ModuleId, OrgId, UserId};

pub const DEFAULT_ENROLLMENT_ROLE: &str = "Student";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Course {
    pub id: CourseId,
    pub org_id: OrgId,
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CourseModule {
    pub id: ModuleId,
    pub course_id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "material_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MaterialType {
    Video,
    Document,
}

/// Lifecycle shared by materials and study packs. `Generated` only applies to
/// study packs: content exists as a draft but nothing has been published yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "processing_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Queued,
    Processing,
    Generated,
    Ready,
    Failed,
}

impl ProcessingStatus {
    /// A material with content is immediately usable; one without waits for
    /// content to be attached.
    pub fn for_content(content: &str) -> Self {
        if content.trim().is_empty() {
            ProcessingStatus::Queued
        } else {
            ProcessingStatus::Ready
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Material {
    pub id: MaterialId,
    pub module_id: ModuleId,
    pub course_id: CourseId,
    pub title: String,
    pub material_type: MaterialType,
    pub source_url: Option<String>,
    pub content: String,
    pub status: ProcessingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ModuleWithMaterials {
    #[serde(flatten)]
    pub module: CourseModule,
    pub materials: Vec<Material>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CourseWithModules {
    #[serde(flatten)]
    pub course: Course,
    pub modules: Vec<ModuleWithMaterials>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EnrolledUser {
    pub user_id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCourseDto {
    pub org_id: OrgId,
    #[validate(length(min = 1, max = 50, message = "code must be between 1 and 50 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 255, message = "title must be between 1 and 255 characters"))]
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct EnrollUserDto {
    pub user_id: UserId,
    #[validate(length(min = 1, max = 50, message = "role must be between 1 and 50 characters"))]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateModuleDto {
    #[validate(length(min = 1, max = 255, message = "title must be between 1 and 255 characters"))]
    pub title: String,
    pub description: Option<String>,
    /// Defaults to after the last existing module.
    #[validate(range(min = 0))]
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateModuleDto {
    #[validate(length(min = 1, max = 255, message = "title must be between 1 and 255 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub position: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMaterialDto {
    #[validate(length(min = 1, max = 255, message = "title must be between 1 and 255 characters"))]
    pub title: String,
    pub material_type: MaterialType,
    #[validate(url(message = "source_url must be a valid URL"))]
    pub source_url: Option<String>,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateMaterialDto {
    #[validate(length(min = 1, max = 255, message = "title must be between 1 and 255 characters"))]
    pub title: Option<String>,
    #[validate(url(message = "source_url must be a valid URL"))]
    pub source_url: Option<String>,
    pub content: Option<String>,
}
