//! # MyWay AI
//!
//! The study-content generation capability used by study packs and the
//! course tutor.
//!
//! - [`StudyContentGenerator`]: the async capability trait
//! - [`GeminiGenerator`]: calls the Gemini `generateContent` endpoint
//! - [`UnavailableGenerator`]: used when no provider is configured; every
//!   call fails with [`GenerationError::Unavailable`]
//!
//! Generators never fabricate content. A failure is reported to the caller,
//! which decides how to surface it.
//!
//! # Example
//!
//! ```ignore
//! use myway_ai::generator_from_config;
//! use myway_config::AiConfig;
//!
//! let generator = generator_from_config(&AiConfig::from_env())?;
//! let summary = generator.generate_summary("Cells are the unit of life...").await?;
//! ```

pub mod error;
pub mod gemini;
pub mod generator;

use std::sync::Arc;

pub use error::GenerationError;
pub use gemini::GeminiGenerator;
pub use generator::{StudyContentGenerator, UnavailableGenerator};

use myway_config::AiConfig;

/// Picks the generator for `config`: Gemini when an API key is present,
/// otherwise the fail-closed [`UnavailableGenerator`].
pub fn generator_from_config(
    config: &AiConfig,
) -> Result<Arc<dyn StudyContentGenerator>, GenerationError> {
    match &config.api_key {
        Some(api_key) => Ok(Arc::new(GeminiGenerator::new(
            api_key.clone(),
            config.model.clone(),
            config.api_base.clone(),
            config.request_timeout,
        )?)),
        None => {
            tracing::warn!("GEMINI_API_KEY not set, study pack generation is disabled");
            Ok(Arc::new(UnavailableGenerator))
        }
    }
}
