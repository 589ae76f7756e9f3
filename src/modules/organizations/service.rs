use anyhow::anyhow;
use myway_auth::OrgRole;
use myway_core::AppError;
use myway_models::ids::{OrgId, UserId};
use myway_models::users::normalize_email;
use sqlx::PgPool;
use tracing::instrument;

use super::model::{
    AddMemberDto, CreateOrganizationDto, Member, Organization, OrganizationWithRole,
    UpdateMemberRoleDto,
};
use crate::metrics;
use crate::utils::auth_helpers::{ensure_org_exists, require_org_member, require_org_role};

const MEMBER_SELECT: &str = r#"SELECT om.user_id, u.email, u.display_name, om.role, om.created_at AS joined_at
       FROM org_memberships om
       JOIN users u ON u.id = om.user_id"#;

pub struct OrganizationService;

impl OrganizationService {
    /// Creates the organization and makes `actor` its first ORGANIZER.
    #[instrument(skip(db))]
    pub async fn create_organization(
        db: &PgPool,
        actor: UserId,
        dto: CreateOrganizationDto,
    ) -> Result<Organization, AppError> {
        let mut tx = db.begin().await?;

        let organization = sqlx::query_as::<_, Organization>(
            r#"INSERT INTO organizations (name) VALUES ($1)
               RETURNING id, name, created_at, updated_at"#,
        )
        .bind(dto.name.trim())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "An organization with this name already exists"))?;

        sqlx::query("INSERT INTO org_memberships (user_id, org_id, role) VALUES ($1, $2, $3)")
            .bind(actor)
            .bind(organization.id)
            .bind(OrgRole::Organizer)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        metrics::track_organization_created();
        tracing::info!(org.id = %organization.id, user.id = %actor, "organization created");

        Ok(organization)
    }

    /// Organizations `actor` belongs to, one row each, with the actor's role.
    #[instrument(skip(db))]
    pub async fn list_organizations(
        db: &PgPool,
        actor: UserId,
    ) -> Result<Vec<OrganizationWithRole>, AppError> {
        let organizations = sqlx::query_as::<_, OrganizationWithRole>(
            r#"SELECT o.id, o.name, om.role, o.created_at
               FROM organizations o
               JOIN org_memberships om ON om.org_id = o.id
               WHERE om.user_id = $1
               ORDER BY o.name"#,
        )
        .bind(actor)
        .fetch_all(db)
        .await?;

        Ok(organizations)
    }

    #[instrument(skip(db))]
    pub async fn get_organization(
        db: &PgPool,
        actor: UserId,
        org_id: OrgId,
    ) -> Result<Organization, AppError> {
        ensure_org_exists(db, org_id).await?;
        require_org_member(db, actor, org_id).await?;

        let organization = sqlx::query_as::<_, Organization>(
            "SELECT id, name, created_at, updated_at FROM organizations WHERE id = $1",
        )
        .bind(org_id)
        .fetch_one(db)
        .await?;

        Ok(organization)
    }

    /// Self-service join as STUDENT.
    #[instrument(skip(db))]
    pub async fn join_organization(
        db: &PgPool,
        actor: UserId,
        org_id: OrgId,
    ) -> Result<Member, AppError> {
        ensure_org_exists(db, org_id).await?;
        Self::insert_member(db, org_id, actor, OrgRole::Student).await
    }

    #[instrument(skip(db))]
    pub async fn list_members(
        db: &PgPool,
        actor: UserId,
        org_id: OrgId,
    ) -> Result<Vec<Member>, AppError> {
        ensure_org_exists(db, org_id).await?;
        require_org_member(db, actor, org_id).await?;

        let members = sqlx::query_as::<_, Member>(&format!(
            "{} WHERE om.org_id = $1 ORDER BY om.created_at",
            MEMBER_SELECT
        ))
        .bind(org_id)
        .fetch_all(db)
        .await?;

        Ok(members)
    }

    #[instrument(skip(db))]
    pub async fn add_member(
        db: &PgPool,
        actor: UserId,
        org_id: OrgId,
        dto: AddMemberDto,
    ) -> Result<Member, AppError> {
        ensure_org_exists(db, org_id).await?;
        require_org_role(db, actor, org_id, &[OrgRole::Organizer]).await?;

        let user_id = sqlx::query_scalar::<_, UserId>("SELECT id FROM users WHERE email = $1")
            .bind(normalize_email(&dto.email))
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("No user registered with that email")))?;

        Self::insert_member(db, org_id, user_id, dto.role).await
    }

    /// Changes a member's role. The organization always keeps at least one
    /// ORGANIZER.
    #[instrument(skip(db))]
    pub async fn change_member_role(
        db: &PgPool,
        actor: UserId,
        org_id: OrgId,
        user_id: UserId,
        dto: UpdateMemberRoleDto,
    ) -> Result<Member, AppError> {
        ensure_org_exists(db, org_id).await?;
        require_org_role(db, actor, org_id, &[OrgRole::Organizer]).await?;

        let mut tx = db.begin().await?;

        // Locking every organizer row serializes concurrent demotions.
        let organizers = sqlx::query_scalar::<_, UserId>(
            "SELECT user_id FROM org_memberships WHERE org_id = $1 AND role = $2 FOR UPDATE",
        )
        .bind(org_id)
        .bind(OrgRole::Organizer)
        .fetch_all(&mut *tx)
        .await?;

        let current = sqlx::query_scalar::<_, OrgRole>(
            "SELECT role FROM org_memberships WHERE org_id = $1 AND user_id = $2",
        )
        .bind(org_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Member not found")))?;

        if current == OrgRole::Organizer && dto.role != OrgRole::Organizer && organizers.len() <= 1
        {
            return Err(AppError::unprocessable(anyhow!(
                "Cannot demote the last organizer of an organization"
            )));
        }

        sqlx::query("UPDATE org_memberships SET role = $3 WHERE org_id = $1 AND user_id = $2")
            .bind(org_id)
            .bind(user_id)
            .bind(dto.role)
            .execute(&mut *tx)
            .await?;

        let member = sqlx::query_as::<_, Member>(&format!(
            "{} WHERE om.org_id = $1 AND om.user_id = $2",
            MEMBER_SELECT
        ))
        .bind(org_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(org.id = %org_id, user.id = %user_id, role = %dto.role, "member role changed");
        Ok(member)
    }

    /// Deletes the organization. Courses, memberships and everything below
    /// them go with it.
    #[instrument(skip(db))]
    pub async fn delete_organization(
        db: &PgPool,
        actor: UserId,
        org_id: OrgId,
    ) -> Result<(), AppError> {
        ensure_org_exists(db, org_id).await?;
        require_org_role(db, actor, org_id, &[OrgRole::Organizer]).await?;

        sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(org_id)
            .execute(db)
            .await?;

        tracing::info!(org.id = %org_id, "organization deleted");
        Ok(())
    }

    async fn insert_member(
        db: &PgPool,
        org_id: OrgId,
        user_id: UserId,
        role: OrgRole,
    ) -> Result<Member, AppError> {
        sqlx::query("INSERT INTO org_memberships (user_id, org_id, role) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(org_id)
            .bind(role)
            .execute(db)
            .await
            .map_err(|e| {
                AppError::from_unique_violation(e, "User is already a member of this organization")
            })?;

        let member = sqlx::query_as::<_, Member>(&format!(
            "{} WHERE om.org_id = $1 AND om.user_id = $2",
            MEMBER_SELECT
        ))
        .bind(org_id)
        .bind(user_id)
        .fetch_one(db)
        .await?;

        Ok(member)
    }
}
