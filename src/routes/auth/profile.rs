use actix_web::web::ReqData;
use actix_web::{web, HttpResponse};
use anyhow::Context;
use chrono::Utc;
use secrecy::Secret;
use sqlx::SqlitePool;

use crate::authentication::{
    validate_password_for_user, AuthError, AuthenticatedUser, SessionKeys,
};
use crate::domain::{UserEmail, UserName, Username};
use crate::routes::users::get_user_profile;
use crate::utils::{e400, ApiError};

#[tracing::instrument(name = "Get current user", skip_all, fields(user_id = %*user))]
pub async fn get_me(
    user: ReqData<AuthenticatedUser>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let profile = get_user_profile(user.user_id, &pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": profile,
    })))
}

#[derive(serde::Deserialize)]
pub struct UpdateProfileBody {
    name: Option<String>,
    username: Option<String>,
    email: Option<String>,
}

#[tracing::instrument(name = "Update profile", skip_all, fields(user_id = %*user))]
pub async fn update_profile(
    body: web::Json<UpdateProfileBody>,
    user: ReqData<AuthenticatedUser>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let UpdateProfileBody {
        name,
        username,
        email,
    } = body.into_inner();
    let name = name.map(UserName::parse).transpose().map_err(e400)?;
    let username = username.map(Username::parse).transpose().map_err(e400)?;
    let email = email.map(UserEmail::parse).transpose().map_err(e400)?;

    sqlx::query(
        r#"
        UPDATE users
        SET name = COALESCE(?, name),
            username = COALESCE(?, username),
            email = COALESCE(?, email),
            updated_at = ?
        WHERE user_id = ?
        "#,
    )
    .bind(name.as_ref().map(AsRef::<str>::as_ref))
    .bind(username.as_ref().map(AsRef::<str>::as_ref))
    .bind(email.as_ref().map(AsRef::<str>::as_ref))
    .bind(Utc::now())
    .bind(user.user_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            ApiError::Validation("Email or username already taken".into())
        }
        e => ApiError::UnexpectedError(
            anyhow::Error::new(e).context("Failed to update the profile"),
        ),
    })?;

    let profile = get_user_profile(user.user_id, &pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Profile updated successfully",
        "user": profile,
    })))
}

#[derive(serde::Deserialize)]
pub struct DeleteAccountBody {
    password: Secret<String>,
}

#[tracing::instrument(name = "Delete account", skip_all, fields(user_id = %*user))]
pub async fn delete_account(
    body: web::Json<DeleteAccountBody>,
    user: ReqData<AuthenticatedUser>,
    pool: web::Data<SqlitePool>,
    session_keys: web::Data<SessionKeys>,
) -> Result<HttpResponse, ApiError> {
    let user_id = user.into_inner().user_id;
    validate_password_for_user(user_id, body.into_inner().password, &pool)
        .await
        .map_err(|e| match e {
            AuthError::InvalidCredentials(_) => {
                ApiError::Validation("Incorrect password".into())
            }
            AuthError::UnexpectedError(e) => ApiError::UnexpectedError(e),
        })?;

    let deleted = sqlx::query("DELETE FROM users WHERE user_id = ?")
        .bind(user_id)
        .execute(pool.get_ref())
        .await
        .context("Failed to delete the account")?
        .rows_affected();
    if deleted == 0 {
        return Err(ApiError::NotFound("User not found".into()));
    }

    Ok(session_keys.end_session(serde_json::json!({
        "success": true,
        "message": "Account deleted successfully",
    })))
}
