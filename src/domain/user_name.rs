use unicode_segmentation::UnicodeSegmentation;

/// Display name shown on the profile.
#[derive(Debug, Clone)]
pub struct UserName(String);

impl UserName {
    pub fn parse(s: String) -> Result<UserName, String> {
        let trimmed = s.trim();
        let length = trimmed.graphemes(true).count();
        let is_too_short = length < 2;
        let is_too_long = length > 50;

        let forbidden_characters =
            ['/', '(', ')', '"', '<', '>', '\\', '{', '}'];
        let contains_forbidden_characters =
            trimmed.chars().any(|g| forbidden_characters.contains(&g));

        if is_too_short || is_too_long {
            Err("Name must be between 2 and 50 characters".to_string())
        } else if contains_forbidden_characters {
            Err(format!("{} is not a valid name.", s))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }
}

impl AsRef<str> for UserName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
