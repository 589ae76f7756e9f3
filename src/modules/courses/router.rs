use axum::{
    Router,
    routing::{get, post},
};

use crate::modules::assignments::controller::{create_assignment, list_assignments};
use crate::modules::course_modules::controller::{create_module, list_modules};
use crate::modules::discussions::controller::{create_thread, list_threads};
use crate::state::AppState;

use super::controller::{
    create_course, delete_course, enroll_in_course, enroll_user, get_course, list_courses,
    list_enrollments,
};

pub fn init_courses_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_course))
        .route("/org/{org_id}", get(list_courses))
        .route("/{id}", get(get_course).delete(delete_course))
        .route("/{id}/enroll", post(enroll_in_course))
        .route(
            "/{id}/enrollments",
            get(list_enrollments).post(enroll_user),
        )
        .route("/{id}/modules", get(list_modules).post(create_module))
        .route(
            "/{id}/assignments",
            get(list_assignments).post(create_assignment),
        )
        .route("/{id}/threads", get(list_threads).post(create_thread))
}
