use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use myway::myway_ai::{GenerationError, StudyContentGenerator};
use myway::myway_auth::{OrgRole, create_access_token};
use myway::myway_config::{AiConfig, CorsConfig, JwtConfig};
use myway::myway_models::study_packs::{Flashcard, QuizContent, QuizQuestion, SummaryContent};
use myway::router::init_router;
use myway::state::AppState;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

/// Deterministic generator: the quiz always has two questions answered
/// "Mitochondria" and "ATP".
pub struct FakeGenerator;

#[async_trait]
impl StudyContentGenerator for FakeGenerator {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn generate_summary(&self, text: &str) -> Result<SummaryContent, GenerationError> {
        Ok(SummaryContent {
            summary: format!("Summary: {}", text.chars().take(40).collect::<String>()),
            bullets: vec!["Cells need energy".to_string()],
        })
    }

    async fn generate_quiz(&self, _text: &str) -> Result<QuizContent, GenerationError> {
        Ok(QuizContent {
            questions: vec![
                QuizQuestion {
                    id: "q1".to_string(),
                    prompt: "Powerhouse of the cell?".to_string(),
                    options: vec!["Nucleus".to_string(), "Mitochondria".to_string()],
                    answer: "Mitochondria".to_string(),
                    explanation: None,
                },
                QuizQuestion {
                    id: "q2".to_string(),
                    prompt: "Energy currency?".to_string(),
                    options: vec!["ATP".to_string(), "DNA".to_string()],
                    answer: "ATP".to_string(),
                    explanation: Some("Adenosine triphosphate".to_string()),
                },
            ],
        })
    }

    async fn generate_flashcards(&self, _text: &str) -> Result<Vec<Flashcard>, GenerationError> {
        Ok(vec![Flashcard {
            front: "ATP".to_string(),
            back: "Energy currency".to_string(),
        }])
    }

    async fn answer_question(&self, _context: &str, query: &str) -> Result<String, GenerationError> {
        Ok(format!("Answer to: {}", query))
    }
}

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "integration-test-secret".to_string(),
        access_token_expiry: 3600,
        refresh_token_expiry: 604800,
    }
}

pub fn setup_test_app(pool: PgPool) -> Router {
    setup_test_app_with(pool, Arc::new(FakeGenerator))
}

#[allow(dead_code)]
pub fn setup_test_app_with(pool: PgPool, generator: Arc<dyn StudyContentGenerator>) -> Router {
    dotenvy::dotenv().ok();
    let state = AppState {
        db: pool,
        jwt_config: test_jwt_config(),
        cors_config: CorsConfig::from_env(),
        ai_config: AiConfig::from_env(),
        generator,
    };
    init_router(state)
}

#[allow(dead_code)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

#[allow(dead_code)]
pub fn generate_unique_email() -> String {
    format!("test-{}@test.com", Uuid::new_v4())
}

/// Inserts a user directly and mints an access token for it. Memberships are
/// left out of the token; authorization reads them from the database.
pub async fn create_test_user(pool: &PgPool, display_name: &str) -> TestUser {
    let email = generate_unique_email();
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"INSERT INTO users (email, password_hash, display_name)
           VALUES ($1, 'not-a-real-hash', $2) RETURNING id"#,
    )
    .bind(&email)
    .bind(display_name)
    .fetch_one(pool)
    .await
    .unwrap();

    let token = create_access_token(id, &email, vec![], &test_jwt_config()).unwrap();
    TestUser { id, email, token }
}

#[allow(dead_code)]
pub async fn create_test_org(pool: &PgPool) -> Uuid {
    sqlx::query_scalar::<_, Uuid>("INSERT INTO organizations (name) VALUES ($1) RETURNING id")
        .bind(format!("Test Org {}", Uuid::new_v4()))
        .fetch_one(pool)
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn add_member(pool: &PgPool, user_id: Uuid, org_id: Uuid, role: OrgRole) {
    sqlx::query("INSERT INTO org_memberships (user_id, org_id, role) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(org_id)
        .bind(role)
        .execute(pool)
        .await
        .unwrap();
}

/// Sends a request through the router and decodes the JSON body (`Null`
/// for an empty body).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

#[allow(dead_code)]
pub async fn create_test_course(pool: &PgPool, org_id: Uuid, created_by: Uuid) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
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

/// A module holding one document material with `content`; returns the
/// material id.
#[allow(dead_code)]
pub async fn create_test_material(pool: &PgPool, course_id: Uuid, content: &str) -> Uuid {
    let module_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO course_modules (course_id, title) VALUES ($1, 'Cells') RETURNING id",
    )
    .bind(course_id)
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query_scalar::<_, Uuid>(
        r#"INSERT INTO materials (module_id, course_id, title, material_type, content, status)
           VALUES ($1, $2, 'Cell energy', 'document', $3, 'ready') RETURNING id"#,
    )
    .bind(module_id)
    .bind(course_id)
    .bind(content)
    .fetch_one(pool)
    .await
    .unwrap()
}

#[allow(dead_code)]
pub async fn enroll_test_user(pool: &PgPool, user_id: Uuid, course_id: Uuid) {
    sqlx::query("INSERT INTO enrollments (user_id, course_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(course_id)
        .execute(pool)
        .await
        .unwrap();
}
