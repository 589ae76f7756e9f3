use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use myway_core::AppError;
use myway_models::ids::{AssignmentId, CourseId, SubmissionId};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::model::{
    Assignment, AssignmentWithProgress, CreateAssignmentDto, GradeSubmissionDto,
    SubmitAssignmentDto, Submission, SubmissionWithUser,
};
use super::service::AssignmentService;

#[utoipa::path(
    post,
    path = "/api/courses/{id}/assignments",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = CreateAssignmentDto,
    responses(
        (status = 201, description = "Assignment created", body = Assignment),
        (status = 403, description = "Teacher or organizer role required", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_assignment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CreateAssignmentDto>,
) -> Result<(StatusCode, Json<Assignment>), AppError> {
    let actor = auth_user.user_id()?;
    let assignment =
        AssignmentService::create_assignment(&state.db, actor, CourseId::from(id), dto).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// List a course's assignments with the caller's progress on each
#[utoipa::path(
    get,
    path = "/api/courses/{id}/assignments",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Assignments with progress", body = Vec<AssignmentWithProgress>),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn list_assignments(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AssignmentWithProgress>>, AppError> {
    let actor = auth_user.user_id()?;
    let assignments =
        AssignmentService::list_assignments(&state.db, actor, CourseId::from(id)).await?;
    Ok(Json(assignments))
}

#[utoipa::path(
    get,
    path = "/api/assignments/{id}",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment with the caller's progress", body = AssignmentWithProgress),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Assignment not found", body = ErrorResponse)
    ),
    tag = "Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_assignment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AssignmentWithProgress>, AppError> {
    let actor = auth_user.user_id()?;
    let assignment =
        AssignmentService::get_assignment(&state.db, actor, AssignmentId::from(id)).await?;
    Ok(Json(assignment))
}

/// Submit (or re-submit) work for an assignment
#[utoipa::path(
    post,
    path = "/api/assignments/{id}/submit",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    request_body = SubmitAssignmentDto,
    responses(
        (status = 201, description = "Submitted", body = Submission),
        (status = 200, description = "Earlier submission replaced", body = Submission),
        (status = 403, description = "Not enrolled in the course", body = ErrorResponse),
        (status = 404, description = "Assignment not found", body = ErrorResponse)
    ),
    tag = "Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn submit_assignment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<SubmitAssignmentDto>,
) -> Result<(StatusCode, Json<Submission>), AppError> {
    let actor = auth_user.user_id()?;
    let outcome = AssignmentService::submit(&state.db, actor, AssignmentId::from(id), dto).await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.submission)))
}

#[utoipa::path(
    get,
    path = "/api/assignments/{id}/submissions",
    params(("id" = Uuid, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Submissions with submitter details", body = Vec<SubmissionWithUser>),
        (status = 403, description = "Teacher or organizer role required", body = ErrorResponse),
        (status = 404, description = "Assignment not found", body = ErrorResponse)
    ),
    tag = "Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn list_submissions(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SubmissionWithUser>>, AppError> {
    let actor = auth_user.user_id()?;
    let submissions =
        AssignmentService::list_submissions(&state.db, actor, AssignmentId::from(id)).await?;
    Ok(Json(submissions))
}

/// Grade a submission; grading again overwrites the previous grade
#[utoipa::path(
    post,
    path = "/api/submissions/{id}/grade",
    params(("id" = Uuid, Path, description = "Submission ID")),
    request_body = GradeSubmissionDto,
    responses(
        (status = 200, description = "Submission graded", body = Submission),
        (status = 403, description = "Teacher or organizer role required", body = ErrorResponse),
        (status = 404, description = "Submission not found", body = ErrorResponse),
        (status = 422, description = "Grade outside 0..=max_points", body = ErrorResponse)
    ),
    tag = "Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn grade_submission(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<GradeSubmissionDto>,
) -> Result<Json<Submission>, AppError> {
    let actor = auth_user.user_id()?;
    let submission =
        AssignmentService::grade(&state.db, actor, SubmissionId::from(id), dto).await?;
    Ok(Json(submission))
}
