//! # MyWay Config
//!
//! Configuration structures loaded from environment variables:
//!
//! - [`jwt`]: token signing secret and lifetimes
//! - [`cors`]: allowed browser origins
//! - [`ai`]: generative-AI provider settings
//!
//! # Example
//!
//! ```ignore
//! use myway_config::{AiConfig, CorsConfig, JwtConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let cors_config = CorsConfig::from_env();
//! let ai_config = AiConfig::from_env();
//! ```

pub mod ai;
pub mod cors;
pub mod jwt;

pub use ai::AiConfig;
pub use cors::CorsConfig;
pub use jwt::JwtConfig;
