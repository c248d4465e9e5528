use actix_web::{web, HttpResponse};
use anyhow::Context;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authentication::SessionKeys;
use crate::configuration::VerificationSettings;
use crate::domain::{Role, UserEmail, VerificationCode};
use crate::email_client::EmailClient;
use crate::routes::auth::emails::send_verification_code;
use crate::routes::users::get_user_profile;
use crate::utils::{e400, ApiError};

const INVALID_CODE: &str = "Invalid or expired verification code";

#[derive(serde::Deserialize)]
pub struct VerifyEmailBody {
    email: String,
    code: String,
}

#[derive(sqlx::FromRow)]
struct ReservedAttempt {
    user_id: Uuid,
    verification_code: String,
}

#[tracing::instrument(
    name = "Verify a user's email",
    skip(body, pool, session_keys, verification),
    fields(user_email = %body.email, user_id = tracing::field::Empty)
)]
pub async fn verify_email(
    body: web::Json<VerifyEmailBody>,
    pool: web::Data<SqlitePool>,
    session_keys: web::Data<SessionKeys>,
    verification: web::Data<VerificationSettings>,
) -> Result<HttpResponse, ApiError> {
    let VerifyEmailBody { email, code } = body.into_inner();
    let invalid = || ApiError::Validation(INVALID_CODE.into());
    let email = UserEmail::parse(email).map_err(|_| invalid())?;
    let code = VerificationCode::parse(code).map_err(|_| invalid())?;

    // Every comparison spends an attempt before it happens, so concurrent
    // guesses cannot outrun the lock.
    let Some(attempt) =
        reserve_verification_attempt(&pool, &email, verification.max_code_attempts)
            .await?
    else {
        tracing::warn!("No verification attempt left for this email");
        return Err(invalid());
    };
    tracing::Span::current()
        .record("user_id", tracing::field::display(&attempt.user_id));

    if attempt.verification_code != code.as_ref() {
        return Err(invalid());
    }

    // Single use: only the request that clears the code wins.
    if !consume_verification_code(
        &pool,
        attempt.user_id,
        &code,
        verification.max_code_attempts,
    )
    .await?
    {
        return Err(invalid());
    }

    let user = get_user_profile(attempt.user_id, &pool)
        .await?
        .context("Verified user vanished")?;
    let role = Role::try_from(user.role.clone()).map_err(|e| anyhow::anyhow!(e))?;
    let token = session_keys
        .issue(user.user_id, role, true)
        .context("Failed to issue a session")?;

    Ok(session_keys.start_session(
        token,
        serde_json::json!({
            "success": true,
            "message": "Email verified successfully.",
            "user": user,
        }),
    ))
}

/// Returns `None` when the user is unknown, already verified, out of
/// attempts or holding an expired code.
#[tracing::instrument(name = "Reserve a verification attempt", skip(pool, email))]
async fn reserve_verification_attempt(
    pool: &SqlitePool,
    email: &UserEmail,
    max_attempts: i64,
) -> Result<Option<ReservedAttempt>, anyhow::Error> {
    sqlx::query_as::<_, ReservedAttempt>(
        r#"
        UPDATE users
        SET verification_attempts = verification_attempts + 1
        WHERE email = ?
          AND is_verified = FALSE
          AND verification_code IS NOT NULL
          AND verification_attempts < ?
          AND verification_code_expires_at > ?
        RETURNING user_id, verification_code
        "#,
    )
    .bind(email.as_ref())
    .bind(max_attempts)
    .bind(Utc::now())
    .fetch_optional(pool)
    .await
    .context("Failed to reserve a verification attempt")
}

#[tracing::instrument(name = "Consume verification code", skip(pool, code))]
async fn consume_verification_code(
    pool: &SqlitePool,
    user_id: Uuid,
    code: &VerificationCode,
    max_attempts: i64,
) -> Result<bool, anyhow::Error> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        UPDATE users
        SET is_verified = TRUE,
            verification_code = NULL,
            verification_code_expires_at = NULL,
            verification_attempts = 0,
            updated_at = ?
        WHERE user_id = ?
          AND verification_code = ?
          AND verification_attempts <= ?
          AND verification_code_expires_at > ?
        "#,
    )
    .bind(now)
    .bind(user_id)
    .bind(code.as_ref())
    .bind(max_attempts)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to mark the user as verified")?;
    Ok(result.rows_affected() == 1)
}

#[derive(serde::Deserialize)]
pub struct ResendVerificationBody {
    email: String,
}

#[derive(sqlx::FromRow)]
struct VerificationTarget {
    user_id: Uuid,
    name: String,
    is_verified: bool,
}

#[tracing::instrument(
    name = "Resend a verification code",
    skip(body, pool, email_client, verification),
    fields(user_email = %body.email)
)]
pub async fn resend_verification(
    body: web::Json<ResendVerificationBody>,
    pool: web::Data<SqlitePool>,
    email_client: web::Data<EmailClient>,
    verification: web::Data<VerificationSettings>,
) -> Result<HttpResponse, ApiError> {
    let email = UserEmail::parse(body.into_inner().email).map_err(e400)?;

    let target = sqlx::query_as::<_, VerificationTarget>(
        r#"
        SELECT user_id, name, is_verified
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email.as_ref())
    .fetch_optional(pool.get_ref())
    .await
    .context("Failed to look up the user to verify")?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if target.is_verified {
        return Err(ApiError::Validation("Email is already verified".into()));
    }

    let code = VerificationCode::generate();
    sqlx::query(
        r#"
        UPDATE users
        SET verification_code = ?,
            verification_code_expires_at = ?,
            verification_attempts = 0,
            updated_at = ?
        WHERE user_id = ?
        "#,
    )
    .bind(code.as_ref())
    .bind(Utc::now() + verification.code_ttl())
    .bind(Utc::now())
    .bind(target.user_id)
    .execute(pool.get_ref())
    .await
    .context("Failed to store a new verification code")?;

    send_verification_code(
        &email_client,
        &email,
        &target.name,
        &code,
        verification.code_ttl_minutes,
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "A new verification code was sent to your email.",
    })))
}
