//! Stateless sessions: an HS256 JWT carried either as a bearer token or in
//! an http-only cookie, never both.
use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::http::header::AUTHORIZATION;
use actix_web::{HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use uuid::Uuid;

use crate::configuration::SessionSettings;
use crate::domain::Role;

pub const SESSION_COOKIE: &str = "jwt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionTransport {
    Bearer,
    Cookie,
}

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("No token provided")]
    Missing,
    #[error("Session has expired")]
    Expired,
    #[error("Invalid token")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("Failed to sign session token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub is_verified: bool,
    pub iat: i64,
    pub exp: i64,
}

pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: chrono::Duration,
    transport: SessionTransport,
    secure_cookie: bool,
}

impl SessionKeys {
    pub fn new(settings: &SessionSettings) -> Self {
        let secret = settings.hmac_secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is checked against the server clock with no grace period.
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: settings.ttl(),
            transport: settings.transport,
            secure_cookie: settings.secure_cookie,
        }
    }

    pub fn issue(
        &self,
        user_id: Uuid,
        role: Role,
        is_verified: bool,
    ) -> Result<String, SessionError> {
        self.issue_at(user_id, role, is_verified, Utc::now())
    }

    fn issue_at(
        &self,
        user_id: Uuid,
        role: Role,
        is_verified: bool,
        issued_at: DateTime<Utc>,
    ) -> Result<String, SessionError> {
        let claims = Claims {
            sub: user_id,
            role,
            is_verified,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(SessionError::Signing)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, SessionError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::Invalid(e),
            })
    }

    /// Reads the token from the configured transport only.
    pub fn extract_token(
        &self,
        request: &HttpRequest,
    ) -> Result<String, SessionError> {
        match self.transport {
            SessionTransport::Bearer => request
                .headers()
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty())
                .ok_or(SessionError::Missing),
            SessionTransport::Cookie => request
                .cookie(SESSION_COOKIE)
                .map(|cookie| cookie.value().to_string())
                .filter(|token| !token.is_empty())
                .ok_or(SessionError::Missing),
        }
    }

    /// 200 response that hands the session to the client.
    pub fn start_session(
        &self,
        token: String,
        mut body: serde_json::Value,
    ) -> HttpResponse {
        match self.transport {
            SessionTransport::Bearer => {
                body["token"] = serde_json::Value::String(token);
                HttpResponse::Ok().json(body)
            }
            SessionTransport::Cookie => HttpResponse::Ok()
                .cookie(self.session_cookie(token))
                .json(body),
        }
    }

    /// 200 response that drops the session cookie, if there is one.
    pub fn end_session(&self, body: serde_json::Value) -> HttpResponse {
        match self.transport {
            SessionTransport::Bearer => HttpResponse::Ok().json(body),
            SessionTransport::Cookie => HttpResponse::Ok()
                .cookie(self.removal_cookie())
                .json(body),
        }
    }

    fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE, token)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookie)
            .max_age(time::Duration::seconds(self.ttl.num_seconds()))
            .finish()
    }

    fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build(SESSION_COOKIE, "")
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookie)
            .finish();
        cookie.make_removal();
        cookie
    }
}
