use std::collections::HashMap;

use anyhow::anyhow;
use myway_auth::OrgRole;
use myway_core::AppError;
use myway_models::ids::{CourseId, ModuleId, OrgId, UserId};
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use super::model::{
    Course, CourseModule, CourseWithModules, CreateCourseDto, DEFAULT_ENROLLMENT_ROLE,
    EnrollUserDto, EnrolledUser, Enrollment, Material, ModuleWithMaterials,
};
use crate::utils::auth_helpers::{
    ensure_org_exists, load_memberships, org_of_course, require_org_member, require_org_role,
};

pub(crate) const COURSE_COLUMNS: &str =
    "id, org_id, code, title, description, created_by, created_at, updated_at";
pub(crate) const MODULE_COLUMNS: &str =
    "id, course_id, title, description, position, created_at, updated_at";
pub(crate) const MATERIAL_COLUMNS: &str = "id, module_id, course_id, title, material_type, source_url, content, status, created_at, updated_at";
const ENROLLMENT_COLUMNS: &str = "id, user_id, course_id, role, created_at";

#[derive(FromRow)]
struct UpsertedEnrollment {
    #[sqlx(flatten)]
    enrollment: Enrollment,
    inserted: bool,
}

/// Outcome of an idempotent enrollment: `created` is false when the row
/// already existed.
#[derive(Debug)]
pub struct EnrollmentOutcome {
    pub enrollment: Enrollment,
    pub created: bool,
}

/// Nests modules (already ordered) and their materials under each course.
fn assemble_course_tree(
    courses: Vec<Course>,
    modules: Vec<CourseModule>,
    materials: Vec<Material>,
) -> Vec<CourseWithModules> {
    let mut materials_by_module: HashMap<ModuleId, Vec<Material>> = HashMap::new();
    for material in materials {
        materials_by_module
            .entry(material.module_id)
            .or_default()
            .push(material);
    }

    let mut modules_by_course: HashMap<CourseId, Vec<ModuleWithMaterials>> = HashMap::new();
    for module in modules {
        let materials = materials_by_module.remove(&module.id).unwrap_or_default();
        modules_by_course
            .entry(module.course_id)
            .or_default()
            .push(ModuleWithMaterials { module, materials });
    }

    courses
        .into_iter()
        .map(|course| {
            let modules = modules_by_course.remove(&course.id).unwrap_or_default();
            CourseWithModules { course, modules }
        })
        .collect()
}

pub struct CourseService;

impl CourseService {
    #[instrument(skip(db))]
    pub async fn create_course(
        db: &PgPool,
        actor: UserId,
        dto: CreateCourseDto,
    ) -> Result<Course, AppError> {
        ensure_org_exists(db, dto.org_id).await?;
        require_org_role(db, actor, dto.org_id, &OrgRole::STAFF).await?;

        let course = sqlx::query_as::<_, Course>(&format!(
            r#"INSERT INTO courses (org_id, code, title, description, created_by)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING {}"#,
            COURSE_COLUMNS
        ))
        .bind(dto.org_id)
        .bind(dto.code.trim())
        .bind(dto.title.trim())
        .bind(&dto.description)
        .bind(actor)
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_unique_violation(
                e,
                "A course with this code already exists in this organization",
            )
        })?;

        tracing::info!(course.id = %course.id, org.id = %course.org_id, "course created");
        Ok(course)
    }

    /// Courses of `org_id` with ordered modules and their materials.
    #[instrument(skip(db))]
    pub async fn list_courses(
        db: &PgPool,
        actor: UserId,
        org_id: OrgId,
    ) -> Result<Vec<CourseWithModules>, AppError> {
        ensure_org_exists(db, org_id).await?;
        require_org_member(db, actor, org_id).await?;

        let courses = sqlx::query_as::<_, Course>(&format!(
            "SELECT {} FROM courses WHERE org_id = $1 ORDER BY code",
            COURSE_COLUMNS
        ))
        .bind(org_id)
        .fetch_all(db)
        .await?;

        Self::load_tree(db, courses).await
    }

    #[instrument(skip(db))]
    pub async fn get_course(
        db: &PgPool,
        actor: UserId,
        course_id: CourseId,
    ) -> Result<CourseWithModules, AppError> {
        let org_id = org_of_course(db, course_id).await?;
        require_org_member(db, actor, org_id).await?;

        let course = sqlx::query_as::<_, Course>(&format!(
            "SELECT {} FROM courses WHERE id = $1",
            COURSE_COLUMNS
        ))
        .bind(course_id)
        .fetch_one(db)
        .await?;

        Self::load_tree(db, vec![course])
            .await?
            .pop()
            .ok_or_else(|| AppError::not_found(anyhow!("Course not found")))
    }

    /// Organizers may delete any course; teachers only the ones they created.
    #[instrument(skip(db))]
    pub async fn delete_course(
        db: &PgPool,
        actor: UserId,
        course_id: CourseId,
    ) -> Result<(), AppError> {
        let org_id = org_of_course(db, course_id).await?;
        let role = require_org_role(db, actor, org_id, &OrgRole::STAFF).await?;

        if role == OrgRole::Teacher {
            let created_by =
                sqlx::query_scalar::<_, UserId>("SELECT created_by FROM courses WHERE id = $1")
                    .bind(course_id)
                    .fetch_one(db)
                    .await?;
            if created_by != actor {
                return Err(AppError::forbidden(
                    "Access denied. Teachers can only delete courses they created",
                ));
            }
        }

        sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(course_id)
            .execute(db)
            .await?;

        tracing::info!(course.id = %course_id, "course deleted");
        Ok(())
    }

    /// Enrolls `actor` as a student. Enrolling twice returns the existing row.
    #[instrument(skip(db))]
    pub async fn enroll(
        db: &PgPool,
        actor: UserId,
        course_id: CourseId,
    ) -> Result<EnrollmentOutcome, AppError> {
        let org_id = org_of_course(db, course_id).await?;
        require_org_member(db, actor, org_id).await?;

        let inserted = sqlx::query_as::<_, Enrollment>(&format!(
            r#"INSERT INTO enrollments (user_id, course_id, role) VALUES ($1, $2, $3)
               ON CONFLICT (user_id, course_id) DO NOTHING
               RETURNING {}"#,
            ENROLLMENT_COLUMNS
        ))
        .bind(actor)
        .bind(course_id)
        .bind(DEFAULT_ENROLLMENT_ROLE)
        .fetch_optional(db)
        .await?;

        if let Some(enrollment) = inserted {
            tracing::info!(user.id = %actor, course.id = %course_id, "enrolled");
            return Ok(EnrollmentOutcome {
                enrollment,
                created: true,
            });
        }

        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {} FROM enrollments WHERE user_id = $1 AND course_id = $2",
            ENROLLMENT_COLUMNS
        ))
        .bind(actor)
        .bind(course_id)
        .fetch_one(db)
        .await?;

        Ok(EnrollmentOutcome {
            enrollment,
            created: false,
        })
    }

    /// Staff enrollment of another org member. Re-enrolling replaces the
    /// course-scoped role.
    #[instrument(skip(db))]
    pub async fn enroll_user(
        db: &PgPool,
        actor: UserId,
        course_id: CourseId,
        dto: EnrollUserDto,
    ) -> Result<EnrollmentOutcome, AppError> {
        let org_id = org_of_course(db, course_id).await?;
        require_org_role(db, actor, org_id, &OrgRole::STAFF).await?;

        if load_memberships(db, dto.user_id, org_id).await?.is_empty() {
            return Err(AppError::unprocessable(anyhow!(
                "User is not a member of this course's organization"
            )));
        }

        let role = dto
            .role
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_ENROLLMENT_ROLE);

        let upserted = sqlx::query_as::<_, UpsertedEnrollment>(&format!(
            r#"INSERT INTO enrollments (user_id, course_id, role) VALUES ($1, $2, $3)
               ON CONFLICT (user_id, course_id) DO UPDATE SET role = EXCLUDED.role
               RETURNING {}, (xmax = 0) AS inserted"#,
            ENROLLMENT_COLUMNS
        ))
        .bind(dto.user_id)
        .bind(course_id)
        .bind(role)
        .fetch_one(db)
        .await?;

        Ok(EnrollmentOutcome {
            enrollment: upserted.enrollment,
            created: upserted.inserted,
        })
    }

    #[instrument(skip(db))]
    pub async fn list_enrollments(
        db: &PgPool,
        actor: UserId,
        course_id: CourseId,
    ) -> Result<Vec<EnrolledUser>, AppError> {
        let org_id = org_of_course(db, course_id).await?;
        require_org_role(db, actor, org_id, &OrgRole::STAFF).await?;

        let enrolled = sqlx::query_as::<_, EnrolledUser>(
            r#"SELECT e.user_id, u.email, u.display_name, e.role, e.created_at AS enrolled_at
               FROM enrollments e
               JOIN users u ON u.id = e.user_id
               WHERE e.course_id = $1
               ORDER BY u.display_name"#,
        )
        .bind(course_id)
        .fetch_all(db)
        .await?;

        Ok(enrolled)
    }

    pub async fn is_enrolled(
        db: &PgPool,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<bool, AppError> {
        let enrolled = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM enrollments WHERE user_id = $1 AND course_id = $2)",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(db)
        .await?;

        Ok(enrolled)
    }

    async fn load_tree(
        db: &PgPool,
        courses: Vec<Course>,
    ) -> Result<Vec<CourseWithModules>, AppError> {
        let course_ids: Vec<CourseId> = courses.iter().map(|c| c.id).collect();

        let modules = sqlx::query_as::<_, CourseModule>(&format!(
            "SELECT {} FROM course_modules WHERE course_id = ANY($1) ORDER BY position, created_at",
            MODULE_COLUMNS
        ))
        .bind(&course_ids)
        .fetch_all(db)
        .await?;

        let materials = sqlx::query_as::<_, Material>(&format!(
            "SELECT {} FROM materials WHERE course_id = ANY($1) ORDER BY created_at",
            MATERIAL_COLUMNS
        ))
        .bind(&course_ids)
        .fetch_all(db)
        .await?;

        Ok(assemble_course_tree(courses, modules, materials))
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

    fn course_dto(org_id: OrgId, code: &str) -> CreateCourseDto {
        CreateCourseDto {
            org_id,
            code: code.to_string(),
            title: "Intro to Biology".to_string(),
            description: None,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_teacher_and_organizer_can_create_course(pool: PgPool) {
        let (organizer, org_id) = member_of_new_org(&pool, OrgRole::Organizer).await;
        let teacher = create_user(&pool, "Teacher").await;
        add_membership(&pool, teacher, org_id, OrgRole::Teacher).await;

        let a = CourseService::create_course(&pool, organizer, course_dto(org_id, "BIO101"))
            .await
            .unwrap();
        let b = CourseService::create_course(&pool, teacher, course_dto(org_id, "BIO102"))
            .await
            .unwrap();

        assert_eq!(a.org_id, org_id);
        assert_eq!(b.created_by, teacher);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_student_cannot_create_course(pool: PgPool) {
        let (student, org_id) = member_of_new_org(&pool, OrgRole::Student).await;

        let err = CourseService::create_course(&pool, student, course_dto(org_id, "BIO101"))
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_organizer_elsewhere_cannot_create_course(pool: PgPool) {
        let (_, org_o) = member_of_new_org(&pool, OrgRole::Organizer).await;
        let (outsider, _) = member_of_new_org(&pool, OrgRole::Organizer).await;

        let err = CourseService::create_course(&pool, outsider, course_dto(org_o, "BIO101"))
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_duplicate_course_code_conflicts(pool: PgPool) {
        let (organizer, org_id) = member_of_new_org(&pool, OrgRole::Organizer).await;
        CourseService::create_course(&pool, organizer, course_dto(org_id, "BIO101"))
            .await
            .unwrap();

        let err = CourseService::create_course(&pool, organizer, course_dto(org_id, "BIO101"))
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_get_course_nests_ordered_modules_and_materials(pool: PgPool) {
        let (organizer, org_id) = member_of_new_org(&pool, OrgRole::Organizer).await;
        let course_id = create_course(&pool, org_id, organizer).await;
        let second = create_module(&pool, course_id, 2).await;
        let first = create_module(&pool, course_id, 1).await;
        create_material(&pool, first, course_id, "Cells are small").await;

        let tree = CourseService::get_course(&pool, organizer, course_id)
            .await
            .unwrap();

        assert_eq!(tree.modules.len(), 2);
        assert_eq!(tree.modules[0].module.id, first);
        assert_eq!(tree.modules[1].module.id, second);
        assert_eq!(tree.modules[0].materials.len(), 1);
        assert!(tree.modules[1].materials.is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_enroll_is_idempotent(pool: PgPool) {
        let (organizer, org_id) = member_of_new_org(&pool, OrgRole::Organizer).await;
        let course_id = create_course(&pool, org_id, organizer).await;
        let student = create_user(&pool, "Student").await;
        add_membership(&pool, student, org_id, OrgRole::Student).await;

        let first = CourseService::enroll(&pool, student, course_id).await.unwrap();
        let second = CourseService::enroll(&pool, student, course_id).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.enrollment.id, second.enrollment.id);
        assert_eq!(first.enrollment.role, "Student");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_non_member_cannot_enroll(pool: PgPool) {
        let (organizer, org_id) = member_of_new_org(&pool, OrgRole::Organizer).await;
        let course_id = create_course(&pool, org_id, organizer).await;
        let outsider = create_user(&pool, "Outsider").await;

        let err = CourseService::enroll(&pool, outsider, course_id)
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_enroll_user_replaces_role(pool: PgPool) {
        let (organizer, org_id) = member_of_new_org(&pool, OrgRole::Organizer).await;
        let course_id = create_course(&pool, org_id, organizer).await;
        let member = create_user(&pool, "Assistant").await;
        add_membership(&pool, member, org_id, OrgRole::Student).await;

        let first = CourseService::enroll_user(
            &pool,
            organizer,
            course_id,
            EnrollUserDto {
                user_id: member,
                role: None,
            },
        )
        .await
        .unwrap();
        let second = CourseService::enroll_user(
            &pool,
            organizer,
            course_id,
            EnrollUserDto {
                user_id: member,
                role: Some("TA".to_string()),
            },
        )
        .await
        .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(second.enrollment.id, first.enrollment.id);
        assert_eq!(second.enrollment.role, "TA");

        let enrolled = CourseService::list_enrollments(&pool, organizer, course_id)
            .await
            .unwrap();
        assert_eq!(enrolled.len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_teacher_deletes_only_own_course(pool: PgPool) {
        let (organizer, org_id) = member_of_new_org(&pool, OrgRole::Organizer).await;
        let teacher = create_user(&pool, "Teacher").await;
        add_membership(&pool, teacher, org_id, OrgRole::Teacher).await;
        let organizers_course = create_course(&pool, org_id, organizer).await;
        let teachers_course = create_course(&pool, org_id, teacher).await;

        let err = CourseService::delete_course(&pool, teacher, organizers_course)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        CourseService::delete_course(&pool, teacher, teachers_course)
            .await
            .unwrap();
        CourseService::delete_course(&pool, organizer, organizers_course)
            .await
            .unwrap();

        let missing = CourseService::get_course(&pool, organizer, teachers_course)
            .await
            .unwrap_err();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
    }
}
