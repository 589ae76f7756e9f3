//! # MyWay Models
//!
//! Database entities, request/response DTOs, and typed IDs for the MyWay API.
//!
//! - [`ids`]: typed UUID wrappers (`UserId`, `CourseId`, ...)
//! - [`users`]: users, login/registration bodies
//! - [`organizations`]: organizations and memberships
//! - [`courses`]: courses, modules, materials, enrollments
//! - [`study_packs`]: AI study packs, quiz attempts, flashcard sessions, tutor
//! - [`assignments`]: assignments and submissions
//! - [`discussions`]: threads and replies
//! - [`analytics`]: mastery, cohort, and organization metrics

pub mod analytics;
pub mod assignments;
pub mod courses;
pub mod discussions;
pub mod ids;
pub mod organizations;
pub mod study_packs;
pub mod users;

pub use ids::*;
pub use myway_auth::OrgRole;
