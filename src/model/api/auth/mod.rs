mod credentials;
mod token;
mod user;

pub use credentials::{Credentials, MAX_USERNAME_LENGTH, MIN_PASSWORD_LENGTH};
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
pub use user::{Admin, Rights, Role, Voter};
