use actix_web::{web, HttpResponse};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::utils::ApiError;

/// Everything about a user that may leave the server.
#[derive(Debug, serde::Serialize, sqlx::FromRow)]
pub struct UserProfile {
    #[serde(rename = "id")]
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub username: String,
    pub role: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[tracing::instrument(name = "Fetch user profile", skip(pool))]
pub async fn get_user_profile(
    user_id: Uuid,
    pool: &SqlitePool,
) -> Result<Option<UserProfile>, anyhow::Error> {
    let profile = sqlx::query_as::<_, UserProfile>(
        r#"
        SELECT user_id, name, email, username, role, is_verified, created_at, updated_at
        FROM users
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to perform a query to retrieve a user profile")?;
    Ok(profile)
}

#[tracing::instrument(name = "List users", skip(pool))]
pub async fn list_users(
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let users = sqlx::query_as::<_, UserProfile>(
        r#"
        SELECT user_id, name, email, username, role, is_verified, created_at, updated_at
        FROM users
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .context("Failed to list users")?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": users,
    })))
}

#[tracing::instrument(name = "List admins", skip(pool))]
pub async fn list_admins(
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let admins = sqlx::query_as::<_, UserProfile>(
        r#"
        SELECT user_id, name, email, username, role, is_verified, created_at, updated_at
        FROM users
        WHERE role = 'admin'
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .context("Failed to list admins")?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": admins,
    })))
}

#[tracing::instrument(name = "Get user", skip(pool))]
pub async fn get_user(
    user_id: web::Path<Uuid>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let user = get_user_profile(user_id.into_inner(), &pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": user,
    })))
}
