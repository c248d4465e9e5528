use rand::RngCore;
use sha2::{Digest, Sha256};

/// 256-bit password reset token.
///
/// The raw value only ever travels inside the emailed link; the database
/// keeps its SHA-256 digest.
#[derive(Debug, Clone)]
pub struct ResetToken(String);

impl ResetToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn parse(s: String) -> Result<ResetToken, String> {
        if s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Self(s.to_lowercase()))
        } else {
            Err("Invalid or expired reset token".into())
        }
    }

    pub fn hash(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl AsRef<str> for ResetToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
