//! Application error type.
//!
//! Every fallible service and handler returns [`AppError`], which pairs an
//! HTTP status with an [`anyhow::Error`] and renders as `{"error": "..."}`.
//! Any error convertible into `anyhow::Error` (sqlx, jsonwebtoken, ...) turns
//! into a 500 through `?`.

use anyhow::{Error, anyhow};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: Error,
}

impl AppError {
    pub fn new<E>(status: StatusCode, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            status,
            error: err.into(),
        }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    pub fn not_found<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::NOT_FOUND, err)
    }

    pub fn unprocessable<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, err)
    }

    pub fn bad_request<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::BAD_REQUEST, err)
    }

    pub fn conflict<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::CONFLICT, err)
    }

    pub fn service_unavailable<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, err)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::new(StatusCode::UNAUTHORIZED, Error::msg(message))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::new(StatusCode::FORBIDDEN, Error::msg(message))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, Error::msg(message))
    }

    /// Same message for unknown email and wrong password.
    pub fn invalid_credentials() -> Self {
        Self::unauthorized("Invalid email or password")
    }

    /// Maps a unique-constraint violation to 409 with `message`; anything
    /// else stays a 500.
    pub fn from_unique_violation(err: sqlx::Error, message: &'static str) -> Self {
        if let sqlx::Error::Database(db_err) = &err
            && db_err.is_unique_violation()
        {
            return Self::conflict(anyhow!(message));
        }
        Self::from(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.error, "request failed");
        }

        let body = Json(json!({
            "error": self.error.to_string()
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        AppError::internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_status() {
        assert_eq!(AppError::not_found(anyhow!("x")).status, StatusCode::NOT_FOUND);
        assert_eq!(AppError::conflict(anyhow!("x")).status, StatusCode::CONFLICT);
        assert_eq!(AppError::forbidden("nope").status, StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::invalid_credentials().status,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::service_unavailable(anyhow!("down")).status,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_from_anyhow_is_internal() {
        let err: AppError = anyhow!("boom").into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error.to_string(), "boom");
    }

    #[test]
    fn test_non_database_error_is_not_conflict() {
        let err = AppError::from_unique_violation(sqlx::Error::RowNotFound, "dup");
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_into_response_status() {
        let response = AppError::forbidden("Access denied").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
