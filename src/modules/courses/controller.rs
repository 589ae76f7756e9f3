use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use myway_core::AppError;
use myway_models::ids::{CourseId, OrgId};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::model::{Course, CourseWithModules, CreateCourseDto, EnrollUserDto, EnrolledUser, Enrollment};
use super::service::{CourseService, EnrollmentOutcome};

fn enrollment_response(outcome: EnrollmentOutcome) -> (StatusCode, Json<Enrollment>) {
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (status, Json(outcome.enrollment))
}

/// Create a course in an organization
#[utoipa::path(
    post,
    path = "/api/courses",
    request_body = CreateCourseDto,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 403, description = "Teacher or organizer role required in the organization", body = ErrorResponse),
        (status = 404, description = "Organization not found", body = ErrorResponse),
        (status = 409, description = "Course code already used in the organization", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn create_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateCourseDto>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let actor = auth_user.user_id()?;
    let course = CourseService::create_course(&state.db, actor, dto).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// Courses of an organization with their modules and materials
#[utoipa::path(
    get,
    path = "/api/courses/org/{org_id}",
    params(("org_id" = Uuid, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Courses", body = Vec<CourseWithModules>),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Organization not found", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn list_courses(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(org_id): Path<Uuid>,
) -> Result<Json<Vec<CourseWithModules>>, AppError> {
    let actor = auth_user.user_id()?;
    let courses = CourseService::list_courses(&state.db, actor, OrgId::from(org_id)).await?;
    Ok(Json(courses))
}

#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course", body = CourseWithModules),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CourseWithModules>, AppError> {
    let actor = auth_user.user_id()?;
    let course = CourseService::get_course(&state.db, actor, CourseId::from(id)).await?;
    Ok(Json(course))
}

#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 403, description = "Organizer, or the teacher who created the course", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let actor = auth_user.user_id()?;
    CourseService::delete_course(&state.db, actor, CourseId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Enroll yourself; repeating the call returns the existing enrollment
#[utoipa::path(
    post,
    path = "/api/courses/{id}/enroll",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 201, description = "Enrolled", body = Enrollment),
        (status = 200, description = "Already enrolled", body = Enrollment),
        (status = 403, description = "Not a member of the course's organization", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn enroll_in_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    let actor = auth_user.user_id()?;
    let outcome = CourseService::enroll(&state.db, actor, CourseId::from(id)).await?;
    Ok(enrollment_response(outcome))
}

/// Enroll another organization member with a course role
#[utoipa::path(
    post,
    path = "/api/courses/{id}/enrollments",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = EnrollUserDto,
    responses(
        (status = 201, description = "Enrolled", body = Enrollment),
        (status = 200, description = "Enrollment role replaced", body = Enrollment),
        (status = 403, description = "Teacher or organizer role required", body = ErrorResponse),
        (status = 422, description = "User is not an organization member", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn enroll_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<EnrollUserDto>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    let actor = auth_user.user_id()?;
    let outcome = CourseService::enroll_user(&state.db, actor, CourseId::from(id), dto).await?;
    Ok(enrollment_response(outcome))
}

#[utoipa::path(
    get,
    path = "/api/courses/{id}/enrollments",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Enrolled users", body = Vec<EnrolledUser>),
        (status = 403, description = "Teacher or organizer role required", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn list_enrollments(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<EnrolledUser>>, AppError> {
    let actor = auth_user.user_id()?;
    let enrolled = CourseService::list_enrollments(&state.db, actor, CourseId::from(id)).await?;
    Ok(Json(enrolled))
}
