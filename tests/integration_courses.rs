mod common;

use axum::http::StatusCode;
use common::{TestUser, add_member, create_test_org, create_test_user, send, setup_test_app};
use myway::myway_auth::OrgRole;
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

async fn create_course(app: &axum::Router, user: &TestUser, org_id: Uuid, code: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/courses",
        Some(&user.token),
        Some(json!({ "org_id": org_id, "code": code, "title": "Biology 101" })),
    )
    .await
}

#[sqlx::test(migrations = "./migrations")]
async fn test_course_creation_requires_staff_role_in_that_org(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let org_a = create_test_org(&pool).await;
    let org_b = create_test_org(&pool).await;

    let teacher = create_test_user(&pool, "Teacher").await;
    let student = create_test_user(&pool, "Student").await;
    let foreign_organizer = create_test_user(&pool, "Elsewhere").await;
    let stranger = create_test_user(&pool, "Stranger").await;
    add_member(&pool, teacher.id, org_a, OrgRole::Teacher).await;
    add_member(&pool, student.id, org_a, OrgRole::Student).await;
    add_member(&pool, foreign_organizer.id, org_b, OrgRole::Organizer).await;

    let (status, course) = create_course(&app, &teacher, org_a, "BIO101").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(course["org_id"], org_a.to_string());

    for user in [&student, &foreign_organizer, &stranger] {
        let (status, _) = create_course(&app, user, org_a, "BIO102").await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{} should be denied", user.email);
    }

    let (status, _) = create_course(&app, &teacher, org_a, "BIO101").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_course_tree_with_modules_and_materials(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let org_id = create_test_org(&pool).await;
    let teacher = create_test_user(&pool, "Teacher").await;
    let student = create_test_user(&pool, "Student").await;
    add_member(&pool, teacher.id, org_id, OrgRole::Teacher).await;
    add_member(&pool, student.id, org_id, OrgRole::Student).await;

    let (_, course) = create_course(&app, &teacher, org_id, "BIO201").await;
    let course_id = course["id"].as_str().unwrap();

    let (status, module) = send(
        &app,
        "POST",
        &format!("/api/courses/{}/modules", course_id),
        Some(&teacher.token),
        Some(json!({ "title": "Cells" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(module["position"], 0);
    let module_id = module["id"].as_str().unwrap();

    let (status, material) = send(
        &app,
        "POST",
        &format!("/api/modules/{}/materials", module_id),
        Some(&teacher.token),
        Some(json!({
            "title": "Cell structure",
            "material_type": "document",
            "content": "Cells have membranes."
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(material["status"], "ready");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/modules/{}/materials", module_id),
        Some(&student.token),
        Some(json!({ "title": "Nope", "material_type": "video" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, tree) = send(
        &app,
        "GET",
        &format!("/api/courses/{}", course_id),
        Some(&student.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tree["modules"][0]["title"], "Cells");
    assert_eq!(tree["modules"][0]["materials"][0]["title"], "Cell structure");

    let (status, courses) = send(
        &app,
        "GET",
        &format!("/api/courses/org/{}", org_id),
        Some(&student.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(courses.as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_enroll_is_idempotent(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let org_id = create_test_org(&pool).await;
    let teacher = create_test_user(&pool, "Teacher").await;
    let student = create_test_user(&pool, "Student").await;
    add_member(&pool, teacher.id, org_id, OrgRole::Teacher).await;
    add_member(&pool, student.id, org_id, OrgRole::Student).await;

    let (_, course) = create_course(&app, &teacher, org_id, "CHEM1").await;
    let enroll_uri = format!("/api/courses/{}/enroll", course["id"].as_str().unwrap());

    let (status, first) = send(&app, "POST", &enroll_uri, Some(&student.token), None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, second) = send(&app, "POST", &enroll_uri, Some(&student.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["id"], second["id"]);

    let (status, enrolled) = send(
        &app,
        "GET",
        &format!("/api/courses/{}/enrollments", course["id"].as_str().unwrap()),
        Some(&teacher.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(enrolled.as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_course_by_student_is_forbidden(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let org_id = create_test_org(&pool).await;
    let teacher = create_test_user(&pool, "Teacher").await;
    let student = create_test_user(&pool, "Student").await;
    add_member(&pool, teacher.id, org_id, OrgRole::Teacher).await;
    add_member(&pool, student.id, org_id, OrgRole::Student).await;

    let (_, course) = create_course(&app, &teacher, org_id, "PHYS1").await;
    let uri = format!("/api/courses/{}", course["id"].as_str().unwrap());

    let (status, _) = send(&app, "DELETE", &uri, Some(&student.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "DELETE", &uri, Some(&teacher.token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &uri, Some(&teacher.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
