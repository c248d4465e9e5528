/// Unique login handle, `[A-Za-z0-9_.]{3,30}`.
#[derive(Debug, Clone)]
pub struct Username(String);

impl Username {
    pub fn parse(s: String) -> Result<Username, String> {
        let trimmed = s.trim();
        let length = trimmed.chars().count();
        if !(3..=30).contains(&length) {
            return Err("Username must be between 3 and 30 characters".into());
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(format!(
                "{} is not a valid username. Use letters, digits, '_' or '.'",
                s
            ));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
