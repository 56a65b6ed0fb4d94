use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::auth::{Credentials, Rights},
    mongodb::Id,
    store::UserStore,
};

/// Core user data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    pub username: String,
    pub password_hash: String,
    pub rights: Rights,
}

impl UserCore {
    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // A malformed hash never matches.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }

    pub fn is_admin(&self) -> bool {
        self.rights == Rights::Admin
    }
}

/// A user without an ID.
pub type NewUser = UserCore;

/// A user from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}

/// Create the configured admin account if there are no admins yet.
///
/// Returns whether an admin was created.
pub async fn ensure_admin_exists<S>(store: &S, credentials: Option<Credentials>) -> Result<bool>
where
    S: UserStore + ?Sized,
{
    if store.count_admins().await? > 0 {
        return Ok(false);
    }
    let Some(credentials) = credentials else {
        warn!("No admin account exists and none is configured");
        return Ok(false);
    };

    let admin = credentials.into_user(Rights::Admin)?;
    let username = admin.username.clone();
    match store.insert_user(admin).await {
        Ok(_) => {
            info!("Created admin account '{username}'");
            Ok(true)
        }
        Err(Error::AlreadyExists(_)) => Err(Error::BadRequest(format!(
            "Configured admin username '{username}' is taken by a non-admin user"
        ))),
        Err(e) => Err(e),
    }
}
