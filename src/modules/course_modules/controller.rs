use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use myway_core::AppError;
use myway_models::courses::{CourseModule, CreateModuleDto, UpdateModuleDto};
use myway_models::ids::{CourseId, ModuleId};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::CourseModuleService;

#[utoipa::path(
    post,
    path = "/api/courses/{id}/modules",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = CreateModuleDto,
    responses(
        (status = 201, description = "Module created", body = CourseModule),
        (status = 403, description = "Teacher or organizer role required", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Modules",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn create_module(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CreateModuleDto>,
) -> Result<(StatusCode, Json<CourseModule>), AppError> {
    let actor = auth_user.user_id()?;
    let module =
        CourseModuleService::create_module(&state.db, actor, CourseId::from(id), dto).await?;
    Ok((StatusCode::CREATED, Json(module)))
}

#[utoipa::path(
    get,
    path = "/api/courses/{id}/modules",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Modules ordered by position", body = Vec<CourseModule>),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Modules",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn list_modules(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CourseModule>>, AppError> {
    let actor = auth_user.user_id()?;
    let modules = CourseModuleService::list_modules(&state.db, actor, CourseId::from(id)).await?;
    Ok(Json(modules))
}

#[utoipa::path(
    patch,
    path = "/api/modules/{id}",
    params(("id" = Uuid, Path, description = "Module ID")),
    request_body = UpdateModuleDto,
    responses(
        (status = 200, description = "Module updated", body = CourseModule),
        (status = 403, description = "Teacher or organizer role required", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse)
    ),
    tag = "Modules",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn update_module(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateModuleDto>,
) -> Result<Json<CourseModule>, AppError> {
    let actor = auth_user.user_id()?;
    let module =
        CourseModuleService::update_module(&state.db, actor, ModuleId::from(id), dto).await?;
    Ok(Json(module))
}

#[utoipa::path(
    delete,
    path = "/api/modules/{id}",
    params(("id" = Uuid, Path, description = "Module ID")),
    responses(
        (status = 204, description = "Module deleted"),
        (status = 403, description = "Teacher or organizer role required", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse)
    ),
    tag = "Modules",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_module(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let actor = auth_user.user_id()?;
    CourseModuleService::delete_module(&state.db, actor, ModuleId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
