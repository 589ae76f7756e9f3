//! # MyWay Core
//!
//! Core types and utilities shared by every MyWay crate.
//!
//! - [`errors`]: the application error type and its HTTP rendering
//! - [`password`]: bcrypt hashing and verification
//!
//! # Example
//!
//! ```ignore
//! use myway_core::errors::AppError;
//! use myway_core::password::hash_password;
//!
//! let error = AppError::not_found(anyhow::anyhow!("Course not found"));
//! let hash = hash_password("secure_password")?;
//! ```

pub mod errors;
pub mod password;

pub use errors::AppError;
pub use password::{hash_password, hash_password_async, verify_password, verify_password_async};
