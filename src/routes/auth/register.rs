use actix_web::{web, HttpResponse};
use anyhow::Context;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, Secret};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authentication::compute_password_hash;
use crate::configuration::VerificationSettings;
use crate::domain::{NewUser, Role, VerificationCode};
use crate::email_client::EmailClient;
use crate::routes::auth::emails::send_verification_code;
use crate::utils::{e400, ApiError};

#[derive(serde::Deserialize)]
pub struct RegisterBody {
    name: String,
    email: String,
    username: String,
    password: Secret<String>,
}

impl TryFrom<RegisterBody> for NewUser {
    type Error = String;

    fn try_from(body: RegisterBody) -> Result<Self, Self::Error> {
        NewUser::parse(body.name, body.email, body.username, body.password)
    }
}

#[tracing::instrument(
    name = "Registering a new user",
    skip(body, pool, email_client, verification),
    fields(
        user_email = %body.email,
        user_username = %body.username
    )
)]
pub async fn register(
    body: web::Json<RegisterBody>,
    pool: web::Data<SqlitePool>,
    email_client: web::Data<EmailClient>,
    verification: web::Data<VerificationSettings>,
) -> Result<HttpResponse, ApiError> {
    let new_user: NewUser = body.0.try_into().map_err(e400)?;

    if user_exists(&pool, &new_user).await? {
        return Err(ApiError::Validation("User already exists".into()));
    }

    let password_hash =
        compute_password_hash(new_user.password.clone().into_secret()).await?;
    let code = VerificationCode::generate();
    let expires_at = Utc::now() + verification.code_ttl();

    insert_user(
        &pool,
        &new_user,
        &password_hash,
        &code,
        expires_at,
    )
    .await?;

    send_verification_code(
        &email_client,
        &new_user.email,
        new_user.name.as_ref(),
        &code,
        verification.code_ttl_minutes,
    )
    .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "message": "Verification code sent to your email.",
        "email": new_user.email.as_ref(),
    })))
}

#[tracing::instrument(name = "Checking for an existing account", skip_all)]
async fn user_exists(
    pool: &SqlitePool,
    new_user: &NewUser,
) -> Result<bool, anyhow::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM users
        WHERE email = ? OR username = ?
        "#,
    )
    .bind(new_user.email.as_ref())
    .bind(new_user.username.as_ref())
    .fetch_one(pool)
    .await
    .context("Failed to check for an existing account")?;
    Ok(count > 0)
}

#[tracing::instrument(
    name = "Saving new user details in the database",
    skip_all
)]
async fn insert_user(
    pool: &SqlitePool,
    new_user: &NewUser,
    password_hash: &Secret<String>,
    code: &VerificationCode,
    code_expires_at: DateTime<Utc>,
) -> Result<Uuid, ApiError> {
    let user_id = Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO users (
            user_id, name, email, username, password_hash, role,
            is_verified, verification_code, verification_code_expires_at,
            verification_attempts, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, FALSE, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(new_user.name.as_ref())
    .bind(new_user.email.as_ref())
    .bind(new_user.username.as_ref())
    .bind(password_hash.expose_secret())
    .bind(Role::User.as_str())
    .bind(code.as_ref())
    .bind(code_expires_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| match e {
        // Lost a race against a concurrent registration.
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            ApiError::Validation("User already exists".into())
        }
        e => ApiError::UnexpectedError(
            anyhow::Error::new(e).context("Failed to insert new user"),
        ),
    })?;
    Ok(user_id)
}
