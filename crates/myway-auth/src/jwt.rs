//! JWT creation and verification.
//!
//! Access tokens embed the user id, email and organization memberships.
//! Refresh tokens carry only the identity plus a unique `jti`; exchanging one
//! re-reads memberships, which is how a client picks up role changes.
//!
//! # Example
//!
//! ```ignore
//! use myway_auth::{create_access_token, verify_token};
//! use myway_config::JwtConfig;
//!
//! let config = JwtConfig::from_env();
//! let token = create_access_token(user_id, "user@example.com", memberships, &config)?;
//! let claims = verify_token(&token, &config)?;
//! ```

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use myway_config::JwtConfig;
use myway_core::AppError;

use crate::claims::{Claims, MembershipClaim, RefreshTokenClaims};

/// Creates a signed access token embedding `org_memberships`.
///
/// Expires after `jwt_config.access_token_expiry` seconds.
///
/// # Errors
///
/// Returns a 500 [`AppError`] if encoding fails.
pub fn create_access_token(
    user_id: Uuid,
    email: &str,
    org_memberships: Vec<MembershipClaim>,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp();
    let exp = (now + jwt_config.access_token_expiry) as usize;
    let now = now as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        org_memberships,
        exp,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_error(format!("Failed to create token: {}", e)))
}

/// Verifies an access token's signature and expiry.
///
/// # Errors
///
/// Returns 401 for a bad signature, an expired token, or a malformed token.
pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token"))
}

pub fn create_refresh_token(
    user_id: Uuid,
    email: &str,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp();
    let exp = (now + jwt_config.refresh_token_expiry) as usize;
    let now = now as usize;

    let claims = RefreshTokenClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_error(format!("Failed to create refresh token: {}", e)))
}

/// Verifies a refresh token. An access token is rejected here because it
/// has no `jti` claim.
pub fn verify_refresh_token(
    token: &str,
    jwt_config: &JwtConfig,
) -> Result<RefreshTokenClaims, AppError> {
    decode::<RefreshTokenClaims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired refresh token"))
}
