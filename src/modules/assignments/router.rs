use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{get_assignment, grade_submission, list_submissions, submit_assignment};

pub fn init_assignments_router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(get_assignment))
        .route("/{id}/submit", post(submit_assignment))
        .route("/{id}/submissions", get(list_submissions))
}

pub fn init_submissions_router() -> Router<AppState> {
    Router::new().route("/{id}/grade", post(grade_submission))
}
