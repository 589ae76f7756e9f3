use anyhow::anyhow;
use myway_auth::OrgRole;
use myway_core::AppError;
use myway_models::courses::{CreateMaterialDto, Material, ProcessingStatus, UpdateMaterialDto};
use myway_models::ids::{CourseId, MaterialId, ModuleId, UserId};
use sqlx::PgPool;
use tracing::instrument;

use crate::modules::courses::service::MATERIAL_COLUMNS;
use crate::utils::auth_helpers::{
    org_of_material, org_of_module, require_org_member, require_org_role,
};

pub struct MaterialService;

impl MaterialService {
    /// Materials with text content are `ready` immediately; empty ones stay
    /// `queued` until content is attached.
    #[instrument(skip(db, dto), fields(module.id = %module_id))]
    pub async fn create_material(
        db: &PgPool,
        actor: UserId,
        module_id: ModuleId,
        dto: CreateMaterialDto,
    ) -> Result<Material, AppError> {
        let org_id = org_of_module(db, module_id).await?;
        require_org_role(db, actor, org_id, &OrgRole::STAFF).await?;

        let course_id =
            sqlx::query_scalar::<_, CourseId>("SELECT course_id FROM course_modules WHERE id = $1")
                .bind(module_id)
                .fetch_one(db)
                .await?;

        let material = sqlx::query_as::<_, Material>(&format!(
            r#"INSERT INTO materials (module_id, course_id, title, material_type, source_url, content, status)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {}"#,
            MATERIAL_COLUMNS
        ))
        .bind(module_id)
        .bind(course_id)
        .bind(dto.title.trim())
        .bind(dto.material_type)
        .bind(&dto.source_url)
        .bind(&dto.content)
        .bind(ProcessingStatus::for_content(&dto.content))
        .fetch_one(db)
        .await?;

        tracing::info!(material.id = %material.id, status = ?material.status, "material created");
        Ok(material)
    }

    #[instrument(skip(db))]
    pub async fn list_materials(
        db: &PgPool,
        actor: UserId,
        module_id: ModuleId,
    ) -> Result<Vec<Material>, AppError> {
        let org_id = org_of_module(db, module_id).await?;
        require_org_member(db, actor, org_id).await?;

        let materials = sqlx::query_as::<_, Material>(&format!(
            "SELECT {} FROM materials WHERE module_id = $1 ORDER BY created_at",
            MATERIAL_COLUMNS
        ))
        .bind(module_id)
        .fetch_all(db)
        .await?;

        Ok(materials)
    }

    #[instrument(skip(db))]
    pub async fn get_material(
        db: &PgPool,
        actor: UserId,
        material_id: MaterialId,
    ) -> Result<Material, AppError> {
        let org_id = org_of_material(db, material_id).await?;
        require_org_member(db, actor, org_id).await?;

        Self::find_material(db, material_id).await
    }

    /// Replacing the content re-derives the status from it. A changed text
    /// also invalidates the material's study pack: a pending draft is
    /// discarded, published content is flagged `content_stale` (it stays
    /// visible until a new draft is approved), and a pack with nothing
    /// published goes back to `queued`.
    #[instrument(skip(db, dto), fields(material.id = %material_id))]
    pub async fn update_material(
        db: &PgPool,
        actor: UserId,
        material_id: MaterialId,
        dto: UpdateMaterialDto,
    ) -> Result<Material, AppError> {
        let org_id = org_of_material(db, material_id).await?;
        require_org_role(db, actor, org_id, &OrgRole::STAFF).await?;

        let status = dto.content.as_deref().map(ProcessingStatus::for_content);

        let mut tx = db.begin().await?;

        let previous_content =
            sqlx::query_scalar::<_, String>("SELECT content FROM materials WHERE id = $1 FOR UPDATE")
                .bind(material_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::not_found(anyhow!("Material not found")))?;

        let material = sqlx::query_as::<_, Material>(&format!(
            r#"UPDATE materials SET
                   title = COALESCE($2, title),
                   source_url = COALESCE($3, source_url),
                   content = COALESCE($4, content),
                   status = COALESCE($5, status),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING {}"#,
            MATERIAL_COLUMNS
        ))
        .bind(material_id)
        .bind(dto.title.as_deref().map(str::trim))
        .bind(&dto.source_url)
        .bind(&dto.content)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        if material.content != previous_content {
            let invalidated = sqlx::query(
                r#"UPDATE study_packs SET
                       content_stale = published_at IS NOT NULL,
                       status = CASE
                           WHEN published_at IS NULL THEN 'queued'::processing_status
                           ELSE status
                       END,
                       requires_approval = FALSE,
                       draft_summary = NULL,
                       draft_quiz = NULL,
                       draft_flashcards = NULL,
                       draft_notes = NULL,
                       draft_generated_at = NULL,
                       updated_at = NOW()
                   WHERE material_id = $1"#,
            )
            .bind(material_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if invalidated > 0 {
                tracing::info!(material.id = %material_id, "material content changed, study pack marked stale");
            }
        }

        tx.commit().await?;

        Ok(material)
    }

    #[instrument(skip(db))]
    pub async fn delete_material(
        db: &PgPool,
        actor: UserId,
        material_id: MaterialId,
    ) -> Result<(), AppError> {
        let org_id = org_of_material(db, material_id).await?;
        require_org_role(db, actor, org_id, &OrgRole::STAFF).await?;

        sqlx::query("DELETE FROM materials WHERE id = $1")
            .bind(material_id)
            .execute(db)
            .await?;

        Ok(())
    }

    pub(crate) async fn find_material(
        db: &PgPool,
        material_id: MaterialId,
    ) -> Result<Material, AppError> {
        sqlx::query_as::<_, Material>(&format!(
            "SELECT {} FROM materials WHERE id = $1",
            MATERIAL_COLUMNS
        ))
        .bind(material_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Material not found")))
    }
}
