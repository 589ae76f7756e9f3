use axum::{
    Json,
    extract::{Path, State},
};
use myway_core::AppError;
use myway_models::ids::{CourseId, OrgId};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;

use super::model::{CourseCohort, CourseProgress, OrgMetrics, StudentMastery};
use super::service::AnalyticsService;

/// Quiz mastery of the current user
#[utoipa::path(
    get,
    path = "/api/analytics/me",
    responses(
        (status = 200, description = "Average and last score, trend, weak topics and recent attempts", body = StudentMastery),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "Analytics",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn my_mastery(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<StudentMastery>, AppError> {
    let user_id = auth_user.user_id()?;
    let mastery = AnalyticsService::student_mastery(&state.db, user_id).await?;
    Ok(Json(mastery))
}

#[utoipa::path(
    get,
    path = "/api/analytics/teacher/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Cohort performance for the course", body = CourseCohort),
        (status = 403, description = "Teacher or organizer role required", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Analytics",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn teacher_cohort(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(course_id): Path<Uuid>,
) -> Result<Json<CourseCohort>, AppError> {
    let actor = auth_user.user_id()?;
    let cohort =
        AnalyticsService::teacher_cohort(&state.db, actor, CourseId::from(course_id)).await?;
    Ok(Json(cohort))
}

#[utoipa::path(
    get,
    path = "/api/analytics/org/{org_id}",
    params(("org_id" = Uuid, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Organization activity metrics", body = OrgMetrics),
        (status = 403, description = "Organizer role required", body = ErrorResponse),
        (status = 404, description = "Organization not found", body = ErrorResponse)
    ),
    tag = "Analytics",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn org_metrics(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(org_id): Path<Uuid>,
) -> Result<Json<OrgMetrics>, AppError> {
    let actor = auth_user.user_id()?;
    let metrics = AnalyticsService::org_metrics(&state.db, actor, OrgId::from(org_id)).await?;
    Ok(Json(metrics))
}

/// The current user's progress through one course
#[utoipa::path(
    get,
    path = "/api/analytics/progress/course/{course_id}",
    params(("course_id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Progress through the course", body = CourseProgress),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Analytics",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn course_progress(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(course_id): Path<Uuid>,
) -> Result<Json<CourseProgress>, AppError> {
    let actor = auth_user.user_id()?;
    let progress =
        AnalyticsService::course_progress(&state.db, actor, CourseId::from(course_id)).await?;
    Ok(Json(progress))
}

/// The current user's progress through every course of an organization
#[utoipa::path(
    get,
    path = "/api/analytics/progress/org/{org_id}",
    params(("org_id" = Uuid, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Progress per course, ordered by title", body = Vec<CourseProgress>),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Organization not found", body = ErrorResponse)
    ),
    tag = "Analytics",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn org_progress(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(org_id): Path<Uuid>,
) -> Result<Json<Vec<CourseProgress>>, AppError> {
    let actor = auth_user.user_id()?;
    let progress = AnalyticsService::org_progress(&state.db, actor, OrgId::from(org_id)).await?;
    Ok(Json(progress))
}
