//! Fixtures for database-backed service tests.

use myway_auth::OrgRole;
use myway_models::ids::{CourseId, MaterialId, ModuleId, OrgId, UserId};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn create_user(pool: &PgPool, display_name: &str) -> UserId {
    sqlx::query_scalar::<_, UserId>(
        r#"INSERT INTO users (email, password_hash, display_name)
           VALUES ($1, 'not-a-real-hash', $2) RETURNING id"#,
    )
    .bind(format!("test-{}@test.com", Uuid::new_v4()))
    .bind(display_name)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_org(pool: &PgPool) -> OrgId {
    sqlx::query_scalar::<_, OrgId>("INSERT INTO organizations (name) VALUES ($1) RETURNING id")
        .bind(format!("Org {}", Uuid::new_v4()))
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn add_membership(pool: &PgPool, user_id: UserId, org_id: OrgId, role: OrgRole) {
    sqlx::query("INSERT INTO org_memberships (user_id, org_id, role) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(org_id)
        .bind(role)
        .execute(pool)
        .await
        .unwrap();
}

/// A user holding `role` in a fresh organization.
pub async fn member_of_new_org(pool: &PgPool, role: OrgRole) -> (UserId, OrgId) {
    let user_id = create_user(pool, "Member").await;
    let org_id = create_org(pool).await;
    add_membership(pool, user_id, org_id, role).await;
    (user_id, org_id)
}

pub async fn create_course(pool: &PgPool, org_id: OrgId, created_by: UserId) -> CourseId {
    sqlx::query_scalar::<_, CourseId>(
        r#"INSERT INTO courses (org_id, code, title, created_by)
           VALUES ($1, $2, 'Biology', $3) RETURNING id"#,
    )
    .bind(org_id)
    .bind(format!("BIO-{}", &Uuid::new_v4().to_string()[..8]))
    .bind(created_by)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_module(pool: &PgPool, course_id: CourseId, position: i32) -> ModuleId {
    sqlx::query_scalar::<_, ModuleId>(
        "INSERT INTO course_modules (course_id, title, position) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(course_id)
    .bind(format!("Module {}", position))
    .bind(position)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_material(
    pool: &PgPool,
    module_id: ModuleId,
    course_id: CourseId,
    content: &str,
) -> MaterialId {
    sqlx::query_scalar::<_, MaterialId>(
        r#"INSERT INTO materials (module_id, course_id, title, material_type, content, status)
           VALUES ($1, $2, 'Cells', 'document', $3,
                   CASE WHEN $3 = '' THEN 'queued'::processing_status ELSE 'ready'::processing_status END)
           RETURNING id"#,
    )
    .bind(module_id)
    .bind(course_id)
    .bind(content)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn enroll(pool: &PgPool, user_id: UserId, course_id: CourseId) {
    sqlx::query("INSERT INTO enrollments (user_id, course_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(course_id)
        .execute(pool)
        .await
        .unwrap();
}
