use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use myway_core::AppError;
use myway_models::ids::{CourseId, ThreadId};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::model::{CreateReplyDto, CreateThreadDto, Reply, Thread, ThreadWithReplies};
use super::service::DiscussionService;

#[utoipa::path(
    get,
    path = "/api/courses/{id}/threads",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Threads, newest first, with replies", body = Vec<ThreadWithReplies>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Discussions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth_user))]
pub async fn list_threads(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ThreadWithReplies>>, AppError> {
    let threads = DiscussionService::list_threads(&state.db, CourseId::from(id)).await?;
    Ok(Json(threads))
}

#[utoipa::path(
    post,
    path = "/api/courses/{id}/threads",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = CreateThreadDto,
    responses(
        (status = 201, description = "Thread created", body = Thread),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Discussions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_thread(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CreateThreadDto>,
) -> Result<(StatusCode, Json<Thread>), AppError> {
    let actor = auth_user.user_id()?;
    let thread = DiscussionService::create_thread(&state.db, actor, CourseId::from(id), dto).await?;
    Ok((StatusCode::CREATED, Json(thread)))
}

#[utoipa::path(
    get,
    path = "/api/threads/{id}",
    params(("id" = Uuid, Path, description = "Thread ID")),
    responses(
        (status = 200, description = "Thread with replies", body = ThreadWithReplies),
        (status = 404, description = "Thread not found", body = ErrorResponse)
    ),
    tag = "Discussions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_thread(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ThreadWithReplies>, AppError> {
    let thread = DiscussionService::get_thread(&state.db, ThreadId::from(id)).await?;
    Ok(Json(thread))
}

#[utoipa::path(
    post,
    path = "/api/threads/{id}/replies",
    params(("id" = Uuid, Path, description = "Thread ID")),
    request_body = CreateReplyDto,
    responses(
        (status = 201, description = "Reply posted", body = Reply),
        (status = 404, description = "Thread not found", body = ErrorResponse)
    ),
    tag = "Discussions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn reply_to_thread(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CreateReplyDto>,
) -> Result<(StatusCode, Json<Reply>), AppError> {
    let actor = auth_user.user_id()?;
    let reply = DiscussionService::reply(&state.db, actor, ThreadId::from(id), dto).await?;
    Ok((StatusCode::CREATED, Json(reply)))
}
