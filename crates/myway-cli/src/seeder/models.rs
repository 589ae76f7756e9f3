//! Data models for database seeding configuration.

use myway_models::{OrgId, OrgRole, UserId};

/// Seed data for creating an organization.
pub struct OrgSeed {
    pub name: String,
}

/// Seed data for creating a user and its single membership.
pub struct UserSeed {
    pub display_name: String,
    pub email: String,
    pub password_hash: String,
    pub org_id: OrgId,
    pub role: OrgRole,
}

/// Seed data for creating a course.
pub struct CourseSeed {
    pub org_id: OrgId,
    pub code: String,
    pub title: String,
    pub description: String,
    pub created_by: UserId,
}

/// Number of members per organization. Every seeded organization also
/// gets one organizer.
#[derive(Clone)]
pub struct MembersPerOrg {
    pub teachers: usize,
    pub students: usize,
}

impl Default for MembersPerOrg {
    fn default() -> Self {
        Self {
            teachers: 3,
            students: 30,
        }
    }
}

#[derive(Clone)]
pub struct CoursesPerOrg {
    pub count: usize,
    pub modules_per_course: usize,
}

impl Default for CoursesPerOrg {
    fn default() -> Self {
        Self {
            count: 4,
            modules_per_course: 3,
        }
    }
}

/// Complete configuration for database seeding.
#[derive(Clone, Default)]
pub struct SeedConfig {
    pub num_orgs: usize,
    pub members_per_org: MembersPerOrg,
    pub courses_per_org: CoursesPerOrg,
}

impl SeedConfig {
    pub fn new(num_orgs: usize) -> Self {
        Self {
            num_orgs,
            ..Default::default()
        }
    }

    pub fn with_members(mut self, members: MembersPerOrg) -> Self {
        self.members_per_org = members;
        self
    }

    pub fn with_courses(mut self, courses: CoursesPerOrg) -> Self {
        self.courses_per_org = courses;
        self
    }

    /// Organizer plus teachers plus students.
    pub fn total_users_per_org(&self) -> usize {
        1 + self.members_per_org.teachers + self.members_per_org.students
    }
}
