//! Request extractors.
//!
//! - [`auth`]: bearer token authentication (`AuthUser`)
//!
//! # Authentication Flow
//!
//! 1. Client sends `Authorization: Bearer <token>`
//! 2. `AuthUser` verifies the JWT and exposes its claims (401 otherwise)
//! 3. The service resolves the organization owning the target resource and
//!    checks the caller's current role there (403 otherwise)
//!
//! ```ignore
//! use crate::middleware::auth::AuthUser;
//!
//! async fn get_profile(auth_user: AuthUser) -> impl IntoResponse {
//!     let user_id = auth_user.user_id()?;
//!     // ...
//! }
//! ```

pub mod auth;
