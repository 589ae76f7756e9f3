use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use myway_core::AppError;
use myway_models::ids::{OrgId, UserId};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::model::{
    AddMemberDto, CreateOrganizationDto, Member, Organization, OrganizationWithRole,
    UpdateMemberRoleDto,
};
use super::service::OrganizationService;

/// Create an organization; the caller becomes its organizer
#[utoipa::path(
    post,
    path = "/api/orgs",
    request_body = CreateOrganizationDto,
    responses(
        (status = 201, description = "Organization created", body = Organization),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 409, description = "Name already taken", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Organizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn create_organization(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateOrganizationDto>,
) -> Result<(StatusCode, Json<Organization>), AppError> {
    let actor = auth_user.user_id()?;
    let organization = OrganizationService::create_organization(&state.db, actor, dto).await?;
    Ok((StatusCode::CREATED, Json(organization)))
}

/// Organizations the caller belongs to
#[utoipa::path(
    get,
    path = "/api/orgs",
    responses(
        (status = 200, description = "Caller's organizations", body = Vec<OrganizationWithRole>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "Organizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn list_organizations(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<OrganizationWithRole>>, AppError> {
    let actor = auth_user.user_id()?;
    let organizations = OrganizationService::list_organizations(&state.db, actor).await?;
    Ok(Json(organizations))
}

#[utoipa::path(
    get,
    path = "/api/orgs/{org_id}",
    params(("org_id" = Uuid, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Organization", body = Organization),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Organization not found", body = ErrorResponse)
    ),
    tag = "Organizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_organization(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(org_id): Path<Uuid>,
) -> Result<Json<Organization>, AppError> {
    let actor = auth_user.user_id()?;
    let organization =
        OrganizationService::get_organization(&state.db, actor, OrgId::from(org_id)).await?;
    Ok(Json(organization))
}

#[utoipa::path(
    delete,
    path = "/api/orgs/{org_id}",
    params(("org_id" = Uuid, Path, description = "Organization ID")),
    responses(
        (status = 204, description = "Organization deleted"),
        (status = 403, description = "Organizer role required", body = ErrorResponse),
        (status = 404, description = "Organization not found", body = ErrorResponse)
    ),
    tag = "Organizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_organization(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(org_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let actor = auth_user.user_id()?;
    OrganizationService::delete_organization(&state.db, actor, OrgId::from(org_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Join an organization as a student
#[utoipa::path(
    post,
    path = "/api/orgs/{org_id}/join",
    params(("org_id" = Uuid, Path, description = "Organization ID")),
    responses(
        (status = 201, description = "Joined", body = Member),
        (status = 404, description = "Organization not found", body = ErrorResponse),
        (status = 409, description = "Already a member", body = ErrorResponse)
    ),
    tag = "Organizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn join_organization(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(org_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Member>), AppError> {
    let actor = auth_user.user_id()?;
    let member =
        OrganizationService::join_organization(&state.db, actor, OrgId::from(org_id)).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

#[utoipa::path(
    get,
    path = "/api/orgs/{org_id}/members",
    params(("org_id" = Uuid, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Members", body = Vec<Member>),
        (status = 403, description = "Not a member", body = ErrorResponse)
    ),
    tag = "Organizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn list_members(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(org_id): Path<Uuid>,
) -> Result<Json<Vec<Member>>, AppError> {
    let actor = auth_user.user_id()?;
    let members = OrganizationService::list_members(&state.db, actor, OrgId::from(org_id)).await?;
    Ok(Json(members))
}

/// Add a registered user to the organization
#[utoipa::path(
    post,
    path = "/api/orgs/{org_id}/members",
    params(("org_id" = Uuid, Path, description = "Organization ID")),
    request_body = AddMemberDto,
    responses(
        (status = 201, description = "Member added", body = Member),
        (status = 403, description = "Organizer role required", body = ErrorResponse),
        (status = 404, description = "No user with that email", body = ErrorResponse),
        (status = 409, description = "Already a member", body = ErrorResponse)
    ),
    tag = "Organizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn add_member(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(org_id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<AddMemberDto>,
) -> Result<(StatusCode, Json<Member>), AppError> {
    let actor = auth_user.user_id()?;
    let member =
        OrganizationService::add_member(&state.db, actor, OrgId::from(org_id), dto).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

#[utoipa::path(
    patch,
    path = "/api/orgs/{org_id}/members/{user_id}",
    params(
        ("org_id" = Uuid, Path, description = "Organization ID"),
        ("user_id" = Uuid, Path, description = "Member's user ID")
    ),
    request_body = UpdateMemberRoleDto,
    responses(
        (status = 200, description = "Role changed", body = Member),
        (status = 403, description = "Organizer role required", body = ErrorResponse),
        (status = 404, description = "Member not found", body = ErrorResponse),
        (status = 422, description = "Would remove the last organizer", body = ErrorResponse)
    ),
    tag = "Organizations",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn change_member_role(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(dto): ValidatedJson<UpdateMemberRoleDto>,
) -> Result<Json<Member>, AppError> {
    let actor = auth_user.user_id()?;
    let member = OrganizationService::change_member_role(
        &state.db,
        actor,
        OrgId::from(org_id),
        UserId::from(user_id),
        dto,
    )
    .await?;
    Ok(Json(member))
}
