use anyhow::anyhow;
use myway_auth::{
    MembershipClaim, create_access_token, create_refresh_token, verify_refresh_token,
};
use myway_config::JwtConfig;
use myway_core::{AppError, hash_password_async, verify_password_async};
use myway_models::ids::UserId;
use myway_models::users::normalize_email;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use super::model::{
    LoginRequest, LoginResponse, RegisterRequestDto, User, UserMembership, UserWithMemberships,
};
use crate::metrics;

const USER_COLUMNS: &str = "id, email, display_name, last_login_at, created_at";

#[derive(FromRow)]
struct UserWithPassword {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

pub struct AuthService;

impl AuthService {
    #[instrument(skip(db, dto), fields(email = %dto.email))]
    pub async fn register_user(db: &PgPool, dto: RegisterRequestDto) -> Result<User, AppError> {
        let email = normalize_email(&dto.email);

        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(&email)
                .fetch_one(db)
                .await?;
        if exists {
            return Err(AppError::conflict(anyhow!("Email already registered")));
        }

        let password_hash = hash_password_async(dto.password).await?;

        // The unique index settles concurrent registrations of the same email.
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, display_name) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&email)
        .bind(&password_hash)
        .bind(dto.display_name.trim())
        .fetch_one(db)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Email already registered"))?;

        metrics::track_user_registered();
        tracing::info!(user.id = %user.id, "user registered");

        Ok(user)
    }

    #[instrument(skip(db, dto, jwt_config), fields(email = %dto.email))]
    pub async fn login_user(
        db: &PgPool,
        dto: LoginRequest,
        jwt_config: &JwtConfig,
    ) -> Result<LoginResponse, AppError> {
        let email = normalize_email(&dto.email);

        let record = sqlx::query_as::<_, UserWithPassword>(&format!(
            "SELECT {}, password_hash FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(&email)
        .fetch_optional(db)
        .await?;

        let Some(record) = record else {
            metrics::track_login("unknown_email");
            return Err(AppError::invalid_credentials());
        };

        if !verify_password_async(dto.password, record.password_hash).await? {
            metrics::track_login("wrong_password");
            return Err(AppError::invalid_credentials());
        }

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET last_login_at = NOW(), updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(record.user.id)
        .fetch_one(db)
        .await?;

        let response = Self::issue_tokens(db, user, jwt_config).await?;
        metrics::track_login("success");

        Ok(response)
    }

    /// Verifies `refresh_token` and issues a new pair whose access token
    /// carries the memberships as they are now.
    #[instrument(skip(db, refresh_token, jwt_config))]
    pub async fn refresh_tokens(
        db: &PgPool,
        refresh_token: &str,
        jwt_config: &JwtConfig,
    ) -> Result<LoginResponse, AppError> {
        let claims = verify_refresh_token(refresh_token, jwt_config)?;
        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| AppError::unauthorized("Invalid or expired refresh token"))?;

        // A deleted account must not be able to keep refreshing.
        let user = Self::find_user(db, user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid or expired refresh token"))?;

        Self::issue_tokens(db, user, jwt_config).await
    }

    #[instrument(skip(db))]
    pub async fn get_profile(db: &PgPool, user_id: UserId) -> Result<UserWithMemberships, AppError> {
        let user = Self::find_user(db, user_id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("User not found")))?;
        let memberships = Self::load_memberships(db, user_id).await?;

        Ok(UserWithMemberships { user, memberships })
    }

    pub async fn load_memberships(
        db: &PgPool,
        user_id: UserId,
    ) -> Result<Vec<UserMembership>, AppError> {
        let memberships = sqlx::query_as::<_, UserMembership>(
            r#"SELECT om.org_id, o.name AS org_name, om.role
               FROM org_memberships om
               JOIN organizations o ON o.id = om.org_id
               WHERE om.user_id = $1
               ORDER BY om.created_at"#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;

        Ok(memberships)
    }

    async fn find_user(db: &PgPool, user_id: UserId) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await?;

        Ok(user)
    }

    async fn issue_tokens(
        db: &PgPool,
        user: User,
        jwt_config: &JwtConfig,
    ) -> Result<LoginResponse, AppError> {
        let memberships = Self::load_memberships(db, user.id).await?;
        let claims: Vec<MembershipClaim> = memberships.iter().map(MembershipClaim::from).collect();

        let access_token =
            create_access_token(user.id.into_inner(), &user.email, claims, jwt_config)?;
        let refresh_token = create_refresh_token(user.id.into_inner(), &user.email, jwt_config)?;
        metrics::track_tokens_issued();

        Ok(LoginResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: jwt_config.access_token_expiry,
            user: UserWithMemberships { user, memberships },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use myway_auth::{OrgRole, verify_token};
    use uuid::Uuid;

    fn test_jwt_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
        }
    }

    fn register_dto(email: &str, password: &str) -> RegisterRequestDto {
        RegisterRequestDto {
            email: email.to_string(),
            password: password.to_string(),
            display_name: "Ada".to_string(),
        }
    }

    async fn create_org_with_member(pool: &PgPool, user_id: UserId, role: OrgRole) -> Uuid {
        let org_id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO organizations (name) VALUES ($1) RETURNING id",
        )
        .bind(format!("Org {}", Uuid::new_v4()))
        .fetch_one(pool)
        .await
        .unwrap();

        sqlx::query("INSERT INTO org_memberships (user_id, org_id, role) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(org_id)
            .bind(role)
            .execute(pool)
            .await
            .unwrap();

        org_id
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_register_normalizes_email(pool: PgPool) {
        let user = AuthService::register_user(&pool, register_dto("  Ada@Example.COM ", "secret1"))
            .await
            .unwrap();

        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.display_name, "Ada");
        assert!(user.last_login_at.is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_register_duplicate_email_conflicts(pool: PgPool) {
        AuthService::register_user(&pool, register_dto("a@x.com", "secret1"))
            .await
            .unwrap();

        let err = AuthService::register_user(&pool, register_dto("A@x.com", "another1"))
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_login_wrong_password_then_right_password(pool: PgPool) {
        let jwt_config = test_jwt_config();
        AuthService::register_user(&pool, register_dto("a@x.com", "secret1"))
            .await
            .unwrap();

        let wrong = AuthService::login_user(
            &pool,
            LoginRequest {
                email: "a@x.com".to_string(),
                password: "wrong".to_string(),
            },
            &jwt_config,
        )
        .await
        .unwrap_err();
        assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

        let unknown = AuthService::login_user(
            &pool,
            LoginRequest {
                email: "nobody@x.com".to_string(),
                password: "secret1".to_string(),
            },
            &jwt_config,
        )
        .await
        .unwrap_err();
        assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.error.to_string(), wrong.error.to_string());

        let response = AuthService::login_user(
            &pool,
            LoginRequest {
                email: "a@x.com".to_string(),
                password: "secret1".to_string(),
            },
            &jwt_config,
        )
        .await
        .unwrap();

        assert!(!response.access_token.is_empty());
        assert_eq!(response.token_type, "Bearer");
        assert!(response.user.user.last_login_at.is_some());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_access_token_embeds_current_memberships(pool: PgPool) {
        let jwt_config = test_jwt_config();
        let user = AuthService::register_user(&pool, register_dto("t@x.com", "secret1"))
            .await
            .unwrap();
        let org_a = create_org_with_member(&pool, user.id, OrgRole::Teacher).await;
        let org_b = create_org_with_member(&pool, user.id, OrgRole::Student).await;

        let response = AuthService::login_user(
            &pool,
            LoginRequest {
                email: "t@x.com".to_string(),
                password: "secret1".to_string(),
            },
            &jwt_config,
        )
        .await
        .unwrap();

        let claims = verify_token(&response.access_token, &jwt_config).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.org_memberships.len(), 2);
        assert_eq!(claims.role_in(org_a), Some(OrgRole::Teacher));
        assert_eq!(claims.role_in(org_b), Some(OrgRole::Student));
        assert_eq!(response.user.memberships.len(), 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_refresh_picks_up_role_change(pool: PgPool) {
        let jwt_config = test_jwt_config();
        let user = AuthService::register_user(&pool, register_dto("r@x.com", "secret1"))
            .await
            .unwrap();
        let org_id = create_org_with_member(&pool, user.id, OrgRole::Student).await;

        let login = AuthService::login_user(
            &pool,
            LoginRequest {
                email: "r@x.com".to_string(),
                password: "secret1".to_string(),
            },
            &jwt_config,
        )
        .await
        .unwrap();

        sqlx::query("UPDATE org_memberships SET role = 'TEACHER' WHERE user_id = $1")
            .bind(user.id)
            .execute(&pool)
            .await
            .unwrap();

        let refreshed = AuthService::refresh_tokens(&pool, &login.refresh_token, &jwt_config)
            .await
            .unwrap();
        let claims = verify_token(&refreshed.access_token, &jwt_config).unwrap();

        assert_eq!(claims.role_in(org_id), Some(OrgRole::Teacher));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_refresh_rejects_access_token(pool: PgPool) {
        let jwt_config = test_jwt_config();
        AuthService::register_user(&pool, register_dto("x@x.com", "secret1"))
            .await
            .unwrap();
        let login = AuthService::login_user(
            &pool,
            LoginRequest {
                email: "x@x.com".to_string(),
                password: "secret1".to_string(),
            },
            &jwt_config,
        )
        .await
        .unwrap();

        let err = AuthService::refresh_tokens(&pool, &login.access_token, &jwt_config)
            .await
            .unwrap_err();

        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }
}
