use dotenvy::dotenv;
use myway::logging::{init_tracing, shutdown_tracer};
use myway::metrics::init_metrics;
use myway::router::init_router;
use myway::state::init_app_state;
use myway_db::run_migrations;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    init_tracing();
    init_metrics();

    let state = init_app_state().await?;
    run_migrations(&state.db).await?;
    info!(provider = state.generator.name(), "study content generator ready");

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{}", port);
    let app = init_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Server running on http://localhost:{}", port);
    info!("📚 Swagger UI available at http://localhost:{}/swagger-ui", port);
    info!("📖 Scalar UI available at http://localhost:{}/scalar", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_tracer().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
