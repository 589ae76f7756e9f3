use anyhow::anyhow;
use myway_auth::OrgRole;
use myway_core::AppError;
use myway_models::courses::{CourseModule, CreateModuleDto, UpdateModuleDto};
use myway_models::ids::{CourseId, ModuleId, UserId};
use sqlx::PgPool;
use tracing::instrument;

use crate::modules::courses::service::MODULE_COLUMNS;
use crate::utils::auth_helpers::{org_of_course, org_of_module, require_org_member, require_org_role};

pub struct CourseModuleService;

impl CourseModuleService {
    /// Appends after the last module unless `position` is given.
    #[instrument(skip(db))]
    pub async fn create_module(
        db: &PgPool,
        actor: UserId,
        course_id: CourseId,
        dto: CreateModuleDto,
    ) -> Result<CourseModule, AppError> {
        let org_id = org_of_course(db, course_id).await?;
        require_org_role(db, actor, org_id, &OrgRole::STAFF).await?;

        let module = sqlx::query_as::<_, CourseModule>(&format!(
            r#"INSERT INTO course_modules (course_id, title, description, position)
               VALUES ($1, $2, $3, COALESCE($4,
                   (SELECT COALESCE(MAX(position) + 1, 0) FROM course_modules WHERE course_id = $1)))
               RETURNING {}"#,
            MODULE_COLUMNS
        ))
        .bind(course_id)
        .bind(dto.title.trim())
        .bind(&dto.description)
        .bind(dto.position)
        .fetch_one(db)
        .await?;

        Ok(module)
    }

    #[instrument(skip(db))]
    pub async fn list_modules(
        db: &PgPool,
        actor: UserId,
        course_id: CourseId,
    ) -> Result<Vec<CourseModule>, AppError> {
        let org_id = org_of_course(db, course_id).await?;
        require_org_member(db, actor, org_id).await?;

        let modules = sqlx::query_as::<_, CourseModule>(&format!(
            "SELECT {} FROM course_modules WHERE course_id = $1 ORDER BY position, created_at",
            MODULE_COLUMNS
        ))
        .bind(course_id)
        .fetch_all(db)
        .await?;

        Ok(modules)
    }

    #[instrument(skip(db))]
    pub async fn update_module(
        db: &PgPool,
        actor: UserId,
        module_id: ModuleId,
        dto: UpdateModuleDto,
    ) -> Result<CourseModule, AppError> {
        let org_id = org_of_module(db, module_id).await?;
        require_org_role(db, actor, org_id, &OrgRole::STAFF).await?;

        let module = sqlx::query_as::<_, CourseModule>(&format!(
            r#"UPDATE course_modules SET
                   title = COALESCE($2, title),
                   description = COALESCE($3, description),
                   position = COALESCE($4, position),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING {}"#,
            MODULE_COLUMNS
        ))
        .bind(module_id)
        .bind(dto.title.as_deref().map(str::trim))
        .bind(&dto.description)
        .bind(dto.position)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Module not found")))?;

        Ok(module)
    }

    /// Deletes the module with its materials and their study packs.
    #[instrument(skip(db))]
    pub async fn delete_module(
        db: &PgPool,
        actor: UserId,
        module_id: ModuleId,
    ) -> Result<(), AppError> {
        let org_id = org_of_module(db, module_id).await?;
        require_org_role(db, actor, org_id, &OrgRole::STAFF).await?;

        sqlx::query("DELETE FROM course_modules WHERE id = $1")
            .bind(module_id)
            .execute(db)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        add_membership, create_course, create_material, create_module, create_user,
        member_of_new_org,
    };
    use axum::http::StatusCode;

    fn module_dto(title: &str, position: Option<i32>) -> CreateModuleDto {
        CreateModuleDto {
            title: title.to_string(),
            description: None,
            position,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_modules_append_in_order(pool: PgPool) {
        let (teacher, org_id) = member_of_new_org(&pool, OrgRole::Teacher).await;
        let course_id = create_course(&pool, org_id, teacher).await;

        let first =
            CourseModuleService::create_module(&pool, teacher, course_id, module_dto("Cells", None))
                .await
                .unwrap();
        let second = CourseModuleService::create_module(
            &pool,
            teacher,
            course_id,
            module_dto("Genetics", None),
        )
        .await
        .unwrap();
        let pinned = CourseModuleService::create_module(
            &pool,
            teacher,
            course_id,
            module_dto("Welcome", Some(0)),
        )
        .await
        .unwrap();

        assert_eq!(first.position, 0);
        assert_eq!(second.position, 1);
        assert_eq!(pinned.position, 0);

        let listed = CourseModuleService::list_modules(&pool, teacher, course_id)
            .await
            .unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[2].id, second.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_student_cannot_change_modules(pool: PgPool) {
        let (teacher, org_id) = member_of_new_org(&pool, OrgRole::Teacher).await;
        let student = create_user(&pool, "Student").await;
        add_membership(&pool, student, org_id, OrgRole::Student).await;
        let course_id = create_course(&pool, org_id, teacher).await;
        let module_id = create_module(&pool, course_id, 0).await;

        let err = CourseModuleService::create_module(
            &pool,
            student,
            course_id,
            module_dto("Nope", None),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let err = CourseModuleService::delete_module(&pool, student, module_id)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        // Reading is fine for any member.
        let listed = CourseModuleService::list_modules(&pool, student, course_id)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_update_module_keeps_unset_fields(pool: PgPool) {
        let (teacher, org_id) = member_of_new_org(&pool, OrgRole::Teacher).await;
        let course_id = create_course(&pool, org_id, teacher).await;
        let module_id = create_module(&pool, course_id, 3).await;

        let updated = CourseModuleService::update_module(
            &pool,
            teacher,
            module_id,
            UpdateModuleDto {
                title: Some("Renamed".to_string()),
                description: None,
                position: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.position, 3);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_delete_module_removes_materials(pool: PgPool) {
        let (teacher, org_id) = member_of_new_org(&pool, OrgRole::Teacher).await;
        let course_id = create_course(&pool, org_id, teacher).await;
        let module_id = create_module(&pool, course_id, 0).await;
        create_material(&pool, module_id, course_id, "text").await;

        CourseModuleService::delete_module(&pool, teacher, module_id)
            .await
            .unwrap();

        let remaining =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM materials WHERE course_id = $1")
                .bind(course_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(remaining, 0);
    }
}
