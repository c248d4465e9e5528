use anyhow::Context;

use crate::domain::{ResetToken, UserEmail, VerificationCode};
use crate::email_client::EmailClient;
use crate::startup::ClientBaseUrl;

#[tracing::instrument(
    name = "Send a verification code to a new user",
    skip(email_client, name, code)
)]
pub async fn send_verification_code(
    email_client: &EmailClient,
    recipient: &UserEmail,
    name: &str,
    code: &VerificationCode,
    ttl_minutes: i64,
) -> Result<(), anyhow::Error> {
    let name = htmlescape::encode_minimal(name);
    let html_body = format!(
        "<h2>Hello {name},</h2>\
        <p>Use this code to verify your email:</p>\
        <h1>{code}</h1>\
        <p>This code expires in {ttl_minutes} minutes.</p>",
        code = code.as_ref(),
    );
    let plain_body = format!(
        "Hello {name},\nYour verification code is {code}.\n\
        This code expires in {ttl_minutes} minutes.",
        code = code.as_ref(),
    );
    email_client
        .send_email(recipient, "Verify your email", &html_body, &plain_body)
        .await
        .context("Failed to send a verification code")
}

#[tracing::instrument(
    name = "Send a password reset link",
    skip(email_client, client_url, name, token)
)]
pub async fn send_reset_link(
    email_client: &EmailClient,
    client_url: &ClientBaseUrl,
    recipient: &UserEmail,
    name: &str,
    token: &ResetToken,
) -> Result<(), anyhow::Error> {
    let reset_link = format!(
        "{}/reset-password/{}",
        client_url.0,
        urlencoding::encode(token.as_ref())
    );
    let name = htmlescape::encode_minimal(name);
    let html_body = format!(
        "<h2>Hello {name},</h2>\
        <p>Click the link below to reset your password:</p>\
        <a href=\"{reset_link}\">{reset_link}</a>"
    );
    let plain_body = format!(
        "Hello {name},\nVisit {reset_link} to reset your password."
    );
    email_client
        .send_email(recipient, "Password Reset Request", &html_body, &plain_body)
        .await
        .context("Failed to send a password reset link")
}
