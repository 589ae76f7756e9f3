pub mod analytics;
pub mod assignments;
pub mod auth;
pub mod course_modules;
pub mod courses;
pub mod discussions;
pub mod materials;
pub mod organizations;
pub mod study_packs;
