mod common;

use axum::http::StatusCode;
use common::{
    add_member, create_test_course, create_test_material, create_test_org, create_test_user,
    enroll_test_user, send, setup_test_app,
};
use myway::myway_auth::OrgRole;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_mastery_cohort_and_org_metrics(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let org_id = create_test_org(&pool).await;
    let organizer = create_test_user(&pool, "Organizer").await;
    let teacher = create_test_user(&pool, "Teacher").await;
    let ada = create_test_user(&pool, "Ada").await;
    let bob = create_test_user(&pool, "Bob").await;
    add_member(&pool, organizer.id, org_id, OrgRole::Organizer).await;
    add_member(&pool, teacher.id, org_id, OrgRole::Teacher).await;
    add_member(&pool, ada.id, org_id, OrgRole::Student).await;
    add_member(&pool, bob.id, org_id, OrgRole::Student).await;

    let course_id = create_test_course(&pool, org_id, teacher.id).await;
    enroll_test_user(&pool, ada.id, course_id).await;
    enroll_test_user(&pool, bob.id, course_id).await;
    let material_id = create_test_material(&pool, course_id, "Mitochondria make ATP.").await;

    let (_, pack) = send(
        &app,
        "POST",
        &format!("/api/ai/generate/{}", material_id),
        Some(&teacher.token),
        None,
    )
    .await;
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/ai/study-packs/{}/approve", material_id),
        Some(&teacher.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let attempts_uri = format!("/api/ai/study-packs/{}/quiz-attempts", pack["id"].as_str().unwrap());

    let (status, _) = send(
        &app,
        "POST",
        &attempts_uri,
        Some(&ada.token),
        Some(json!({ "answers": { "q1": "Mitochondria", "q2": "ATP" } })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        "POST",
        &attempts_uri,
        Some(&bob.token),
        Some(json!({ "answers": { "q1": "Nucleus", "q2": "DNA" } })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, mastery) = send(&app, "GET", "/api/analytics/me", Some(&ada.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mastery["avg_score"], 100.0);
    assert_eq!(mastery["total_attempts"], 1);
    assert_eq!(mastery["recent_attempts"][0]["material_title"], "Cell energy");
    assert_eq!(mastery["last_score"], 100);
    assert_eq!(mastery["score_trend"], json!([100]));
    assert!(mastery["weak_topics"].as_array().unwrap().is_empty());

    let (_, bob_mastery) = send(&app, "GET", "/api/analytics/me", Some(&bob.token), None).await;
    assert_eq!(bob_mastery["last_score"], 0);
    assert_eq!(bob_mastery["weak_topics"][0]["material_title"], "Cell energy");

    let (status, progress) = send(
        &app,
        "GET",
        &format!("/api/analytics/progress/course/{}", course_id),
        Some(&ada.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress["total_materials"], 1);
    assert_eq!(progress["progress_percentage"], 100.0);
    assert_eq!(progress["quiz_attempts"], 1);
    assert!(progress["last_activity"].is_string());

    let cohort_uri = format!("/api/analytics/teacher/{}", course_id);
    let (status, _) = send(&app, "GET", &cohort_uri, Some(&ada.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, cohort) = send(&app, "GET", &cohort_uri, Some(&teacher.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cohort["total_students"], 2);
    assert_eq!(cohort["at_risk_count"], 1);
    assert_eq!(cohort["cohort_avg_score"], 50.0);
    assert_eq!(cohort["students"][0]["display_name"], "Ada");
    assert_eq!(cohort["students"][1]["at_risk"], true);
    assert_eq!(cohort["weak_topics"][0]["avg_score"], 50.0);

    let org_uri = format!("/api/analytics/org/{}", org_id);
    let (status, _) = send(&app, "GET", &org_uri, Some(&teacher.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, metrics) = send(&app, "GET", &org_uri, Some(&organizer.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["total_members"], 4);
    assert_eq!(metrics["total_courses"], 1);
    assert_eq!(metrics["study_packs_ready"], 1);
    assert_eq!(metrics["quizzes_taken"], 2);
    assert!(metrics["daily_active_users"].as_i64().unwrap() >= 2);
    assert_eq!(metrics["activation_rate"], 0.5);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_mastery_without_attempts_is_zero(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let user = create_test_user(&pool, "Newbie").await;

    let (status, mastery) = send(&app, "GET", "/api/analytics/me", Some(&user.token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(mastery["avg_score"], 0.0);
    assert_eq!(mastery["total_attempts"], 0);
    assert!(mastery["recent_attempts"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_outside_posters_do_not_count_as_active(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let org_id = create_test_org(&pool).await;
    let organizer = create_test_user(&pool, "Organizer").await;
    add_member(&pool, organizer.id, org_id, OrgRole::Organizer).await;
    let course_id = create_test_course(&pool, org_id, organizer.id).await;

    for name in ["Visitor A", "Visitor B", "Visitor C"] {
        let visitor = create_test_user(&pool, name).await;
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/courses/{}/threads", course_id),
            Some(&visitor.token),
            Some(json!({ "title": "Hello", "body": "Anyone here?" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, metrics) = send(
        &app,
        "GET",
        &format!("/api/analytics/org/{}", org_id),
        Some(&organizer.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["total_members"], 1);
    assert_eq!(metrics["daily_active_users"], 0);
    assert_eq!(metrics["weekly_active_users"], 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_org_progress_lists_courses_for_members(pool: PgPool) {
    let app = setup_test_app(pool.clone());
    let org_id = create_test_org(&pool).await;
    let student = create_test_user(&pool, "Student").await;
    let outsider = create_test_user(&pool, "Outsider").await;
    add_member(&pool, student.id, org_id, OrgRole::Student).await;
    let course_id = create_test_course(&pool, org_id, student.id).await;
    create_test_material(&pool, course_id, "Mitochondria make ATP.").await;
    let uri = format!("/api/analytics/progress/org/{}", org_id);

    let (status, progress) = send(&app, "GET", &uri, Some(&student.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress.as_array().unwrap().len(), 1);
    assert_eq!(progress[0]["course_id"], json!(course_id));
    assert_eq!(progress[0]["progress_percentage"], 0.0);

    let (status, _) = send(&app, "GET", &uri, Some(&outsider.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
