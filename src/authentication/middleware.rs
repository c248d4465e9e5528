use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::{web, HttpMessage};
use actix_web_lab::middleware::Next;
use anyhow::Context;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authentication::{SessionError, SessionKeys};
use crate::domain::Role;
use crate::utils::ApiError;

/// Identity attached to the request once the session checks out.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl std::fmt::Display for AuthenticatedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.user_id.fmt(f)
    }
}

#[derive(sqlx::FromRow)]
struct SessionUser {
    user_id: Uuid,
    email: String,
    role: String,
    is_verified: bool,
}

pub async fn reject_anonymous_users(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let user = {
        let keys = req
            .app_data::<web::Data<SessionKeys>>()
            .context("Session keys are not registered as application data")
            .map_err(ApiError::UnexpectedError)?;
        let pool = req
            .app_data::<web::Data<SqlitePool>>()
            .context("The connection pool is not registered as application data")
            .map_err(ApiError::UnexpectedError)?;
        authenticate(keys, pool, req.request()).await?
    };

    req.extensions_mut().insert(user);
    next.call(req).await
}

/// Must run after `reject_anonymous_users`.
pub async fn reject_non_admins(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let is_admin = req
        .extensions()
        .get::<AuthenticatedUser>()
        .map(AuthenticatedUser::is_admin);
    match is_admin {
        Some(true) => next.call(req).await,
        Some(false) => {
            Err(ApiError::Forbidden("Access denied: Admins only".into()).into())
        }
        None => Err(ApiError::Authentication("No token provided".into()).into()),
    }
}

#[tracing::instrument(
    name = "Authenticate request",
    skip_all,
    fields(user_id = tracing::field::Empty)
)]
async fn authenticate(
    keys: &SessionKeys,
    pool: &SqlitePool,
    request: &actix_web::HttpRequest,
) -> Result<AuthenticatedUser, ApiError> {
    let claims = keys
        .extract_token(request)
        .and_then(|token| keys.decode(&token))
        .map_err(|e| {
            tracing::warn!(error.message = %e, "Rejected session token");
            match e {
                SessionError::Signing(_) => {
                    ApiError::UnexpectedError(anyhow::Error::new(e))
                }
                _ => ApiError::Authentication(e.to_string()),
            }
        })?;
    tracing::Span::current().record("user_id", tracing::field::display(&claims.sub));

    // The token may outlive role changes and deletions: the database wins.
    let user = sqlx::query_as::<_, SessionUser>(
        r#"
        SELECT user_id, email, role, is_verified
        FROM users
        WHERE user_id = ?
        "#,
    )
    .bind(claims.sub)
    .fetch_optional(pool)
    .await
    .context("Failed to look up the session user")?
    .ok_or_else(|| ApiError::Authentication("User not found".into()))?;

    if !user.is_verified {
        return Err(ApiError::Forbidden("Email not verified".into()));
    }
    let role = Role::try_from(user.role).map_err(|e| anyhow::anyhow!(e))?;

    Ok(AuthenticatedUser {
        user_id: user.user_id,
        email: user.email,
        role,
    })
}
