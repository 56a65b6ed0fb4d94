use argon2::Config;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::db::user::NewUser;

use super::Rights;

pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Raw credentials, received from a user. These are never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Check the credentials are acceptable for a new account.
    ///
    /// Usernames are 1 to 150 letters, digits or `@.+-_`; passwords are at
    /// least 8 characters.
    pub fn validate(&self) -> Result<()> {
        let length = self.username.chars().count();
        if length == 0 || length > MAX_USERNAME_LENGTH {
            return Err(Error::BadRequest(format!(
                "Username must be between 1 and {MAX_USERNAME_LENGTH} characters"
            )));
        }
        if !self
            .username
            .chars()
            .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
        {
            return Err(Error::BadRequest(
                "Username may only contain letters, digits and @/./+/-/_".to_string(),
            ));
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::BadRequest(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        Ok(())
    }

    /// Turn these credentials into a new user with the given rights, hashing
    /// the password.
    pub fn into_user(self, rights: Rights) -> Result<NewUser> {
        self.validate()?;

        // 16 bytes is recommended for password hashing:
        //  https://en.wikipedia.org/wiki/Argon2
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(self.password.as_bytes(), &salt, &Config::default())?;
        Ok(NewUser {
            username: self.username,
            password_hash,
            rights,
        })
    }
}
