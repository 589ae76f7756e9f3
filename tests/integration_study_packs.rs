mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{
    add_member, create_test_course, create_test_material, create_test_org, create_test_user,
    send, setup_test_app, setup_test_app_with,
};
use myway::myway_ai::UnavailableGenerator;
use myway::myway_auth::OrgRole;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_generate_review_practice_and_regenerate(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let org_id = create_test_org(&pool).await;
    let teacher = create_test_user(&pool, "Teacher").await;
    let student = create_test_user(&pool, "Student").await;
    add_member(&pool, teacher.id, org_id, OrgRole::Teacher).await;
    add_member(&pool, student.id, org_id, OrgRole::Student).await;
    let course_id = create_test_course(&pool, org_id, teacher.id).await;
    let material_id = create_test_material(&pool, course_id, "Mitochondria make ATP.").await;
    let generate_uri = format!("/api/ai/generate/{}", material_id);
    let pack_uri = format!("/api/ai/study-packs/{}", material_id);
    let draft_uri = format!("{}/draft", pack_uri);
    let approve_uri = format!("{}/approve", pack_uri);

    let (status, _) = send(&app, "POST", &generate_uri, Some(&student.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, draft) = send(&app, "POST", &generate_uri, Some(&teacher.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(draft["status"], "generated");
    assert_eq!(draft["quiz"]["questions"].as_array().unwrap().len(), 2);
    let pack_id = draft["id"].as_str().unwrap().to_string();

    // Nothing is published yet.
    let (status, _) = send(&app, "GET", &pack_uri, Some(&student.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", &draft_uri, Some(&student.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "POST", &approve_uri, Some(&student.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, edited) = send(
        &app,
        "PATCH",
        &draft_uri,
        Some(&teacher.token),
        Some(json!({ "summary": "Cells run on ATP.", "key_points": ["ATP", "Mitochondria"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["summary"]["bullets"], json!(["ATP", "Mitochondria"]));

    let (status, published) = send(&app, "POST", &approve_uri, Some(&teacher.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["status"], "ready");
    assert_eq!(published["summary"]["summary"], "Cells run on ATP.");
    assert_eq!(published["approved_by"], json!(teacher.id));
    assert!(published["published_at"].is_string());

    let (status, fetched) = send(&app, "GET", &pack_uri, Some(&student.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], published["id"]);

    let (status, attempt) = send(
        &app,
        "POST",
        &format!("/api/ai/study-packs/{}/quiz-attempts", pack_id),
        Some(&student.token),
        Some(json!({ "answers": { "q1": " mitochondria ", "q2": "DNA" } })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(attempt["correct"], 1);
    assert_eq!(attempt["total"], 2);
    assert_eq!(attempt["attempt"]["score"], 50);

    let (status, session) = send(
        &app,
        "POST",
        &format!("/api/ai/study-packs/{}/flashcard-sessions", pack_id),
        Some(&student.token),
        Some(json!({ "responses": ["known", "unknown", "unknown"], "duration_sec": 90 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["known_count"], 1);
    assert_eq!(session["unknown_count"], 2);

    let (status, history) = send(
        &app,
        "GET",
        "/api/ai/flashcard-sessions",
        Some(&student.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history[0]["id"], session["id"]);
    assert_eq!(history[0]["material_title"], "Cell energy");

    let (status, regenerated) = send(
        &app,
        "POST",
        &generate_uri,
        Some(&teacher.token),
        Some(json!({ "notes": "Focus on ATP" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(regenerated["id"], published["id"]);
    assert_eq!(regenerated["status"], "ready");
    assert_eq!(regenerated["notes"], "Focus on ATP");

    // Students keep the approved version while the new draft waits.
    let (_, fetched) = send(&app, "GET", &pack_uri, Some(&student.token), None).await;
    assert_eq!(fetched["summary"]["summary"], "Cells run on ATP.");
    assert_eq!(fetched["requires_approval"], true);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_failed_regeneration_keeps_pack_published(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let offline_app = setup_test_app_with(pool.clone(), Arc::new(UnavailableGenerator));
    let org_id = create_test_org(&pool).await;
    let teacher = create_test_user(&pool, "Teacher").await;
    let student = create_test_user(&pool, "Student").await;
    add_member(&pool, teacher.id, org_id, OrgRole::Teacher).await;
    add_member(&pool, student.id, org_id, OrgRole::Student).await;
    let course_id = create_test_course(&pool, org_id, teacher.id).await;
    let material_id = create_test_material(&pool, course_id, "Mitochondria make ATP.").await;
    let generate_uri = format!("/api/ai/generate/{}", material_id);

    let (_, draft) = send(&app, "POST", &generate_uri, Some(&teacher.token), None).await;
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/ai/study-packs/{}/approve", material_id),
        Some(&teacher.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&offline_app, "POST", &generate_uri, Some(&teacher.token), None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, pack) = send(
        &app,
        "GET",
        &format!("/api/ai/study-packs/{}", material_id),
        Some(&student.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pack["status"], "ready");

    let (status, attempt) = send(
        &app,
        "POST",
        &format!("/api/ai/study-packs/{}/quiz-attempts", draft["id"].as_str().unwrap()),
        Some(&student.token),
        Some(json!({ "answers": { "q1": "Mitochondria", "q2": "ATP" } })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(attempt["attempt"]["score"], 100);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_missing_pack_and_empty_material(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let org_id = create_test_org(&pool).await;
    let teacher = create_test_user(&pool, "Teacher").await;
    add_member(&pool, teacher.id, org_id, OrgRole::Teacher).await;
    let course_id = create_test_course(&pool, org_id, teacher.id).await;
    let material_id = create_test_material(&pool, course_id, "   ").await;

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/ai/study-packs/{}", material_id),
        Some(&teacher.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/ai/generate/{}", material_id),
        Some(&teacher.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_unconfigured_provider_fails_closed(pool: PgPool) {
    let app = setup_test_app_with(pool.clone(), Arc::new(UnavailableGenerator));
    let org_id = create_test_org(&pool).await;
    let teacher = create_test_user(&pool, "Teacher").await;
    add_member(&pool, teacher.id, org_id, OrgRole::Teacher).await;
    let course_id = create_test_course(&pool, org_id, teacher.id).await;
    let material_id = create_test_material(&pool, course_id, "Some real content").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/ai/generate/{}", material_id),
        Some(&teacher.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "generation unavailable");

    let (_, pack) = send(
        &app,
        "GET",
        &format!("/api/ai/study-packs/{}", material_id),
        Some(&teacher.token),
        None,
    )
    .await;
    assert_eq!(pack["status"], "failed");
    assert!(pack["published_at"].is_null());

    let (status, _) = send(
        &app,
        "POST",
        "/api/ai/tutor",
        Some(&teacher.token),
        Some(json!({ "course_id": course_id, "query": "Explain cells" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_tutor_answers_members_only(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let org_id = create_test_org(&pool).await;
    let student = create_test_user(&pool, "Student").await;
    let outsider = create_test_user(&pool, "Outsider").await;
    add_member(&pool, student.id, org_id, OrgRole::Student).await;
    let course_id = create_test_course(&pool, org_id, student.id).await;
    create_test_material(&pool, course_id, "Mitochondria make ATP.").await;
    let body = json!({ "course_id": course_id, "query": "What makes ATP?" });

    let (status, answer) = send(&app, "POST", "/api/ai/tutor", Some(&student.token), Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(answer["answer"], "Answer to: What makes ATP?");
    assert_eq!(answer["source_references"], json!(["Cell energy"]));

    let (status, _) = send(&app, "POST", "/api/ai/tutor", Some(&outsider.token), Some(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
