use actix_web::{web, HttpResponse};
use anyhow::Context;
use secrecy::Secret;
use sqlx::SqlitePool;

use crate::authentication::{validate_credentials, Credentials, SessionKeys};
use crate::domain::Role;
use crate::routes::users::get_user_profile;
use crate::utils::ApiError;

#[derive(serde::Deserialize)]
pub struct LoginBody {
    email: String,
    password: Secret<String>,
}

#[tracing::instrument(
    skip(body, pool, session_keys),
    fields(email = %body.email, user_id = tracing::field::Empty)
)]
pub async fn login(
    body: web::Json<LoginBody>,
    pool: web::Data<SqlitePool>,
    session_keys: web::Data<SessionKeys>,
) -> Result<HttpResponse, ApiError> {
    let LoginBody { email, password } = body.into_inner();
    let credentials = Credentials { email, password };

    let user_id = validate_credentials(credentials, &pool)
        .await
        .map_err(|e| {
            tracing::warn!(error.message = %e, "Login rejected");
            ApiError::from(e)
        })?;
    tracing::Span::current()
        .record("user_id", tracing::field::display(&user_id));

    let user = get_user_profile(user_id, &pool)
        .await?
        .context("Authenticated user vanished")?;
    // No session for unverified accounts.
    if !user.is_verified {
        return Err(ApiError::Authentication(
            "Please verify your email first".into(),
        ));
    }

    let role = Role::try_from(user.role.clone()).map_err(|e| anyhow::anyhow!(e))?;
    let token = session_keys
        .issue(user.user_id, role, user.is_verified)
        .context("Failed to issue a session")?;

    Ok(session_keys.start_session(
        token,
        serde_json::json!({
            "success": true,
            "message": "Logged in successfully",
            "user": user,
        }),
    ))
}

pub async fn log_out(session_keys: web::Data<SessionKeys>) -> HttpResponse {
    session_keys.end_session(serde_json::json!({
        "success": true,
        "message": "Logged out successfully",
    }))
}
