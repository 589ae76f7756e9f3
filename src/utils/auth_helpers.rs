//! Organization-scoped authorization helpers.
//!
//! Every role check resolves the organization that owns the target resource
//! and reads the caller's membership in that organization from the database.
//! The membership snapshot in the access token is never trusted for
//! authorization, so a role change takes effect on the next request.

use anyhow::anyhow;
use myway_auth::{MembershipClaim, OrgRole, authorize};
use myway_core::AppError;
use myway_models::ids::{
    AssignmentId, CourseId, MaterialId, ModuleId, OrgId, StudyPackId, SubmissionId, ThreadId,
    UserId,
};
use sqlx::PgPool;
use tracing::instrument;

/// Current memberships of `user_id` in `org_id` (zero or one row).
pub async fn load_memberships(
    db: &PgPool,
    user_id: UserId,
    org_id: OrgId,
) -> Result<Vec<MembershipClaim>, AppError> {
    let memberships = sqlx::query_as::<_, MembershipClaim>(
        "SELECT org_id, role FROM org_memberships WHERE user_id = $1 AND org_id = $2",
    )
    .bind(user_id)
    .bind(org_id)
    .fetch_all(db)
    .await?;

    Ok(memberships)
}

/// Requires `user_id` to hold one of `roles` in `org_id` and returns the
/// role actually held. Denials are 403.
#[instrument(skip(db))]
pub async fn require_org_role(
    db: &PgPool,
    user_id: UserId,
    org_id: OrgId,
    roles: &[OrgRole],
) -> Result<OrgRole, AppError> {
    let memberships = load_memberships(db, user_id, org_id).await?;

    if let Err(denial) = authorize(&memberships, roles, Some(org_id.into_inner())) {
        tracing::warn!(user.id = %user_id, org.id = %org_id, reason = %denial, "authorization denied");
        crate::metrics::track_authorization_check(false);
        return Err(denial.into_app_error());
    }
    crate::metrics::track_authorization_check(true);

    // The gate passed, so a membership exists unless no roles were required.
    memberships
        .first()
        .map(|m| m.role)
        .ok_or_else(|| AppError::forbidden("Access denied. You are not a member of this organization"))
}

/// Shorthand for "any member of the organization".
pub async fn require_org_member(
    db: &PgPool,
    user_id: UserId,
    org_id: OrgId,
) -> Result<OrgRole, AppError> {
    require_org_role(db, user_id, org_id, &OrgRole::ANY).await
}

async fn owning_org(
    db: &PgPool,
    sql: &'static str,
    id: uuid::Uuid,
    what: &'static str,
) -> Result<OrgId, AppError> {
    sqlx::query_scalar::<_, OrgId>(sql)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("{} not found", what)))
}

pub async fn ensure_org_exists(db: &PgPool, org_id: OrgId) -> Result<(), AppError> {
    owning_org(
        db,
        "SELECT id FROM organizations WHERE id = $1",
        org_id.into_inner(),
        "Organization",
    )
    .await
    .map(|_| ())
}

pub async fn org_of_course(db: &PgPool, course_id: CourseId) -> Result<OrgId, AppError> {
    owning_org(
        db,
        "SELECT org_id FROM courses WHERE id = $1",
        course_id.into_inner(),
        "Course",
    )
    .await
}

pub async fn org_of_module(db: &PgPool, module_id: ModuleId) -> Result<OrgId, AppError> {
    owning_org(
        db,
        r#"SELECT c.org_id FROM course_modules m
           JOIN courses c ON c.id = m.course_id
           WHERE m.id = $1"#,
        module_id.into_inner(),
        "Module",
    )
    .await
}

pub async fn org_of_material(db: &PgPool, material_id: MaterialId) -> Result<OrgId, AppError> {
    owning_org(
        db,
        r#"SELECT c.org_id FROM materials mt
           JOIN courses c ON c.id = mt.course_id
           WHERE mt.id = $1"#,
        material_id.into_inner(),
        "Material",
    )
    .await
}

pub async fn org_of_study_pack(db: &PgPool, pack_id: StudyPackId) -> Result<OrgId, AppError> {
    owning_org(
        db,
        r#"SELECT c.org_id FROM study_packs sp
           JOIN materials mt ON mt.id = sp.material_id
           JOIN courses c ON c.id = mt.course_id
           WHERE sp.id = $1"#,
        pack_id.into_inner(),
        "Study pack",
    )
    .await
}

pub async fn org_of_assignment(db: &PgPool, assignment_id: AssignmentId) -> Result<OrgId, AppError> {
    owning_org(
        db,
        r#"SELECT c.org_id FROM assignments a
           JOIN courses c ON c.id = a.course_id
           WHERE a.id = $1"#,
        assignment_id.into_inner(),
        "Assignment",
    )
    .await
}

pub async fn org_of_submission(db: &PgPool, submission_id: SubmissionId) -> Result<OrgId, AppError> {
    owning_org(
        db,
        r#"SELECT c.org_id FROM submissions s
           JOIN assignments a ON a.id = s.assignment_id
           JOIN courses c ON c.id = a.course_id
           WHERE s.id = $1"#,
        submission_id.into_inner(),
        "Submission",
    )
    .await
}

pub async fn org_of_thread(db: &PgPool, thread_id: ThreadId) -> Result<OrgId, AppError> {
    owning_org(
        db,
        r#"SELECT c.org_id FROM threads t
           JOIN courses c ON c.id = t.course_id
           WHERE t.id = $1"#,
        thread_id.into_inner(),
        "Thread",
    )
    .await
}
