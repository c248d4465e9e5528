use actix_web::web::ReqData;
use actix_web::{web, HttpResponse};
use anyhow::Context;
use chrono::Utc;
use secrecy::{ExposeSecret, Secret};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authentication::{
    compute_password_hash, validate_password_for_user, AuthError,
    AuthenticatedUser,
};
use crate::configuration::VerificationSettings;
use crate::domain::{NewPassword, ResetToken, UserEmail};
use crate::email_client::EmailClient;
use crate::routes::auth::emails::send_reset_link;
use crate::startup::ClientBaseUrl;
use crate::utils::{e400, ApiError};

const INVALID_RESET_TOKEN: &str = "Invalid or expired reset token";

#[derive(serde::Deserialize)]
pub struct ChangePasswordBody {
    current_password: Secret<String>,
    new_password: Secret<String>,
}

#[tracing::instrument(name = "Change password", skip_all, fields(user_id = %*user))]
pub async fn change_password(
    body: web::Json<ChangePasswordBody>,
    user: ReqData<AuthenticatedUser>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let user_id = user.into_inner().user_id;
    let ChangePasswordBody {
        current_password,
        new_password,
    } = body.into_inner();

    validate_password_for_user(user_id, current_password, &pool)
        .await
        .map_err(|e| match e {
            AuthError::InvalidCredentials(_) => {
                ApiError::Validation("Current password is incorrect".into())
            }
            AuthError::UnexpectedError(e) => ApiError::UnexpectedError(e),
        })?;
    let new_password = NewPassword::parse(new_password).map_err(e400)?;

    let password_hash = compute_password_hash(new_password.into_secret()).await?;
    sqlx::query(
        r#"
        UPDATE users
        SET password_hash = ?, updated_at = ?
        WHERE user_id = ?
        "#,
    )
    .bind(password_hash.expose_secret())
    .bind(Utc::now())
    .bind(user_id)
    .execute(pool.get_ref())
    .await
    .context("Failed to change the user's password")?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Password changed successfully",
    })))
}

#[derive(serde::Deserialize)]
pub struct ForgotPasswordBody {
    email: String,
}

#[derive(sqlx::FromRow)]
struct ResetTarget {
    user_id: Uuid,
    name: String,
}

#[tracing::instrument(
    name = "Request a password reset",
    skip(body, pool, email_client, client_url, verification),
    fields(user_email = %body.email)
)]
pub async fn forgot_password(
    body: web::Json<ForgotPasswordBody>,
    pool: web::Data<SqlitePool>,
    email_client: web::Data<EmailClient>,
    client_url: web::Data<ClientBaseUrl>,
    verification: web::Data<VerificationSettings>,
) -> Result<HttpResponse, ApiError> {
    let email = UserEmail::parse(body.into_inner().email).map_err(e400)?;

    let target = sqlx::query_as::<_, ResetTarget>(
        r#"
        SELECT user_id, name
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email.as_ref())
    .fetch_optional(pool.get_ref())
    .await
    .context("Failed to look up the user to reset")?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    // A new request replaces any outstanding token.
    let token = ResetToken::generate();
    sqlx::query(
        r#"
        UPDATE users
        SET reset_password_token_hash = ?,
            reset_password_expires_at = ?,
            updated_at = ?
        WHERE user_id = ?
        "#,
    )
    .bind(token.hash())
    .bind(Utc::now() + verification.reset_token_ttl())
    .bind(Utc::now())
    .bind(target.user_id)
    .execute(pool.get_ref())
    .await
    .context("Failed to store the password reset token")?;

    send_reset_link(&email_client, &client_url, &email, &target.name, &token)
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Reset email sent",
    })))
}

#[derive(serde::Deserialize)]
pub struct ResetPasswordBody {
    new_password: Secret<String>,
}

#[tracing::instrument(name = "Reset password", skip_all)]
pub async fn reset_password(
    token: web::Path<String>,
    body: web::Json<ResetPasswordBody>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let token = ResetToken::parse(token.into_inner())
        .map_err(|_| ApiError::Validation(INVALID_RESET_TOKEN.into()))?;
    let new_password =
        NewPassword::parse(body.into_inner().new_password).map_err(e400)?;
    let password_hash = compute_password_hash(new_password.into_secret()).await?;

    // Single use: the token is cleared by the same statement that checks it.
    let now = Utc::now();
    let updated = sqlx::query(
        r#"
        UPDATE users
        SET password_hash = ?,
            reset_password_token_hash = NULL,
            reset_password_expires_at = NULL,
            updated_at = ?
        WHERE reset_password_token_hash = ?
          AND reset_password_expires_at > ?
        "#,
    )
    .bind(password_hash.expose_secret())
    .bind(now)
    .bind(token.hash())
    .bind(now)
    .execute(pool.get_ref())
    .await
    .context("Failed to reset the password")?
    .rows_affected();

    if updated == 0 {
        return Err(ApiError::Validation(INVALID_RESET_TOKEN.into()));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Password reset successful",
    })))
}
