use std::fmt;
use std::sync::Arc;

use myway_ai::{StudyContentGenerator, generator_from_config};
use myway_config::{AiConfig, CorsConfig, JwtConfig};
use myway_db::init_db_pool;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
    pub ai_config: AiConfig,
    pub generator: Arc<dyn StudyContentGenerator>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("db", &self.db)
            .field("jwt_config", &"<redacted>")
            .field("cors_config", &self.cors_config)
            .field("ai_config", &self.ai_config)
            .field("generator", &self.generator.name())
            .finish()
    }
}

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let ai_config = AiConfig::from_env();
    let generator = generator_from_config(&ai_config)?;

    Ok(AppState {
        db: init_db_pool().await,
        jwt_config: JwtConfig::from_env(),
        cors_config: CorsConfig::from_env(),
        ai_config,
        generator,
    })
}
