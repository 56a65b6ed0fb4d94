use rocket::{http::Status, response::Responder, Request};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] mongodb::error::Error),
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Argon2(#[from] argon2::Error),
    #[error(transparent)]
    OidParse(#[from] mongodb::bson::oid::Error),
    #[error("Storage failure: {0}")]
    Storage(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// A [`Error::NotFound`] naming the missing entity.
    pub fn not_found(what: impl Into<String>, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{} with ID '{id}'", what.into()))
    }

    /// The HTTP status this error is reported as.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Storage(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Status::Unauthorized,
                _ => Status::BadRequest,
            },
            Self::Argon2(_) | Self::OidParse(_) | Self::BadRequest(_) => Status::BadRequest,
            Self::AlreadyExists(_) => Status::Conflict,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::NotFound(_) => Status::NotFound,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        if status.code >= 500 {
            error!("{} {}: {self}", req.method(), req.uri());
        } else {
            warn!("{} {}: {self}", req.method(), req.uri());
        }
        Err(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(
            Error::AlreadyExists("user 'bob'".into()).status(),
            Status::Conflict
        );
        assert_eq!(Error::not_found("Question", 7).status(), Status::NotFound);
        assert_eq!(
            Error::Storage("gave up".into()).status(),
            Status::InternalServerError
        );
        assert_eq!(
            Error::Unauthorized("bad password".into()).status(),
            Status::Unauthorized
        );
    }

    #[test]
    fn not_found_message() {
        assert_eq!(
            Error::not_found("Question", "abc").to_string(),
            "Not found: Question with ID 'abc'"
        );
    }
}
