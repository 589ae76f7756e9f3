use crate::docs::ApiDoc;
use crate::logging::logging_middleware;
use crate::metrics::{metrics_handler, metrics_middleware};
use crate::modules::analytics::init_analytics_router;
use crate::modules::assignments::{init_assignments_router, init_submissions_router};
use crate::modules::auth::init_auth_router;
use crate::modules::course_modules::init_course_modules_router;
use crate::modules::courses::init_courses_router;
use crate::modules::discussions::init_threads_router;
use crate::modules::materials::init_materials_router;
use crate::modules::organizations::init_organizations_router;
use crate::modules::study_packs::init_ai_router;
use crate::state::AppState;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::get;
use axum::{Json, Router, middleware};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

async fn health() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

pub fn init_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .nest(
            "/api",
            Router::new()
                .nest("/auth", init_auth_router())
                .nest("/orgs", init_organizations_router())
                .nest("/courses", init_courses_router())
                .nest("/modules", init_course_modules_router())
                .nest("/materials", init_materials_router())
                .nest("/assignments", init_assignments_router())
                .nest("/submissions", init_submissions_router())
                .nest("/threads", init_threads_router())
                .nest("/analytics", init_analytics_router())
                .nest("/ai", init_ai_router()),
        )
        .with_state(state.clone())
        .layer({
            let allowed_origins: Vec<HeaderValue> = state
                .cors_config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::ACCEPT,
                ])
                .allow_credentials(true)
        })
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}
