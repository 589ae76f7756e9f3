use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{course_progress, my_mastery, org_metrics, org_progress, teacher_cohort};

pub fn init_analytics_router() -> Router<AppState> {
    Router::new()
        .route("/me", get(my_mastery))
        .route("/teacher/{course_id}", get(teacher_cohort))
        .route("/org/{org_id}", get(org_metrics))
        .route("/progress/course/{course_id}", get(course_progress))
        .route("/progress/org/{org_id}", get(org_progress))
}
