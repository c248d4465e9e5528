pub mod middleware;
mod password;
mod session;

pub use middleware::{reject_anonymous_users, reject_non_admins, AuthenticatedUser};
pub use password::{
    compute_password_hash, validate_credentials, validate_password_for_user,
    AuthError, Credentials,
};
pub use session::{SessionError, SessionKeys, SessionTransport, SESSION_COOKIE};
