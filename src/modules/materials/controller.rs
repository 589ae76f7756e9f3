use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use myway_core::AppError;
use myway_models::courses::{CreateMaterialDto, Material, UpdateMaterialDto};
use myway_models::ids::{MaterialId, ModuleId};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::MaterialService;

#[utoipa::path(
    post,
    path = "/api/modules/{id}/materials",
    params(("id" = Uuid, Path, description = "Module ID")),
    request_body = CreateMaterialDto,
    responses(
        (status = 201, description = "Material created", body = Material),
        (status = 403, description = "Teacher or organizer role required", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse)
    ),
    tag = "Materials",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn create_material(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CreateMaterialDto>,
) -> Result<(StatusCode, Json<Material>), AppError> {
    let actor = auth_user.user_id()?;
    let material =
        MaterialService::create_material(&state.db, actor, ModuleId::from(id), dto).await?;
    Ok((StatusCode::CREATED, Json(material)))
}

#[utoipa::path(
    get,
    path = "/api/modules/{id}/materials",
    params(("id" = Uuid, Path, description = "Module ID")),
    responses(
        (status = 200, description = "Materials of the module", body = Vec<Material>),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Module not found", body = ErrorResponse)
    ),
    tag = "Materials",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn list_materials(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Material>>, AppError> {
    let actor = auth_user.user_id()?;
    let materials = MaterialService::list_materials(&state.db, actor, ModuleId::from(id)).await?;
    Ok(Json(materials))
}

#[utoipa::path(
    get,
    path = "/api/materials/{id}",
    params(("id" = Uuid, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Material", body = Material),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Material not found", body = ErrorResponse)
    ),
    tag = "Materials",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_material(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Material>, AppError> {
    let actor = auth_user.user_id()?;
    let material = MaterialService::get_material(&state.db, actor, MaterialId::from(id)).await?;
    Ok(Json(material))
}

#[utoipa::path(
    patch,
    path = "/api/materials/{id}",
    params(("id" = Uuid, Path, description = "Material ID")),
    request_body = UpdateMaterialDto,
    responses(
        (status = 200, description = "Material updated", body = Material),
        (status = 403, description = "Teacher or organizer role required", body = ErrorResponse),
        (status = 404, description = "Material not found", body = ErrorResponse)
    ),
    tag = "Materials",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_material(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateMaterialDto>,
) -> Result<Json<Material>, AppError> {
    let actor = auth_user.user_id()?;
    let material =
        MaterialService::update_material(&state.db, actor, MaterialId::from(id), dto).await?;
    Ok(Json(material))
}

#[utoipa::path(
    delete,
    path = "/api/materials/{id}",
    params(("id" = Uuid, Path, description = "Material ID")),
    responses(
        (status = 204, description = "Material deleted"),
        (status = 403, description = "Teacher or organizer role required", body = ErrorResponse),
        (status = 404, description = "Material not found", body = ErrorResponse)
    ),
    tag = "Materials",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_material(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let actor = auth_user.user_id()?;
    MaterialService::delete_material(&state.db, actor, MaterialId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
