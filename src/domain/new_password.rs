use secrecy::{ExposeSecret, Secret};

/// A password the user wants to start using.
///
/// Only new passwords go through this check: logging in with an old,
/// weaker password keeps working.
#[derive(Debug, Clone)]
pub struct NewPassword(Secret<String>);

impl NewPassword {
    pub fn parse(s: Secret<String>) -> Result<NewPassword, String> {
        let candidate = s.expose_secret();
        let length = candidate.chars().count();
        if length < 6 {
            return Err("Password must be at least 6 characters long".into());
        }
        if length > 128 {
            return Err("Password must be at most 128 characters long".into());
        }
        let has_letter = candidate.chars().any(char::is_alphabetic);
        let has_digit = candidate.chars().any(|c| c.is_ascii_digit());
        if !(has_letter && has_digit) {
            return Err(
                "Password must contain both letters and numbers".into()
            );
        }
        Ok(Self(s))
    }

    pub fn into_secret(self) -> Secret<String> {
        self.0
    }
}
