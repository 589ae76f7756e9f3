//! # MyWay CLI
//!
//! Database seeding utilities for MyWay testing and development.
//!
//! This library crate provides the seeding functionality used by the CLI binary.
//!
//! ## Usage
//!
//! ```ignore
//! use myway_cli::seeder::{seed_all, SeedConfig};
//!
//! let config = SeedConfig::new(3); // 3 organizations with defaults
//! seed_all(&pool, config).await?;
//! ```

pub mod seeder;
