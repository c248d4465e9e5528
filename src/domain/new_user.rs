use secrecy::Secret;

use crate::domain::{NewPassword, UserEmail, UserName, Username};

#[derive(Debug)]
pub struct NewUser {
    pub name: UserName,
    pub email: UserEmail,
    pub username: Username,
    pub password: NewPassword,
}

impl NewUser {
    pub fn parse(
        name: String,
        email: String,
        username: String,
        password: Secret<String>,
    ) -> Result<NewUser, String> {
        Ok(Self {
            name: UserName::parse(name)?,
            email: UserEmail::parse(email)?,
            username: Username::parse(username)?,
            password: NewPassword::parse(password)?,
        })
    }
}
