use rand::Rng;

/// Six digit code mailed to a freshly registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationCode(String);

impl VerificationCode {
    pub fn generate() -> Self {
        // `thread_rng` is a CSPRNG reseeded from the OS.
        let code: u32 = rand::thread_rng().gen_range(100_000..=999_999);
        Self(code.to_string())
    }

    /// Parse a code submitted by a client.
    pub fn parse(s: String) -> Result<VerificationCode, String> {
        let trimmed = s.trim();
        let well_formed = trimmed.len() == 6
            && trimmed.chars().all(|c| c.is_ascii_digit())
            && !trimmed.starts_with('0');
        if well_formed {
            Ok(Self(trimmed.to_string()))
        } else {
            Err("Invalid or expired verification code".into())
        }
    }
}

impl AsRef<str> for VerificationCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
