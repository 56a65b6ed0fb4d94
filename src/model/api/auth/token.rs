use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::{try_outcome, IntoOutcome},
    request::{FromRequest, Outcome},
    time::Duration,
    Request,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    db::user::User,
    mongodb::Id,
    store::{Store, UserStore},
};

use super::user::{Rights, Role};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authentication token representing a specific user acting in role `R`.
#[derive(Serialize, Deserialize)]
pub struct AuthToken<R> {
    pub id: Id,
    #[serde(rename = "rgt")]
    pub rights: Rights,
    #[serde(skip)]
    phantom: PhantomData<R>,
}

impl<R> AuthToken<R> {
    /// Does this token permit the given rights?
    pub fn permits(&self, target: Rights) -> bool {
        self.rights >= target
    }

    /// Serialize this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Result<Cookie<'static>> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?;

        Ok(Cookie::build(AUTH_TOKEN_COOKIE, token)
            .path("/")
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish())
    }

    /// Deserialize a token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> Result<Self> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<R>>| claims.claims.token)?;
        Ok(token)
    }
}

impl<R> AuthToken<R>
where
    R: Role,
{
    /// Create a new [`AuthToken`] for the given user, carrying that user's rights.
    pub fn new(user: &User) -> Self {
        Self {
            id: user.id,
            rights: user.rights,
            phantom: PhantomData,
        }
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<R> {
    #[serde(flatten, bound = "")]
    token: AuthToken<R>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, R> FromRequest<'r> for AuthToken<R>
where
    R: Role + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the cookie and verify that its user still
    /// exists with rights enough for role `R`.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let (Some(config), Some(store)) = (
            req.rocket().state::<Config>(),
            req.rocket().state::<Store>(),
        ) else {
            return Outcome::Failure((
                Status::InternalServerError,
                Error::Storage("Config or store is not managed".to_string()),
            ));
        };

        // Forward to any routes that do not require an authentication token.
        let cookie = try_outcome!(req.cookies().get(AUTH_TOKEN_COOKIE).or_forward(()));

        // Decode the token.
        let token: Self = try_outcome!(Self::from_cookie(cookie, config).or_forward(()));
        if !token.permits(R::RIGHTS) {
            return Outcome::Forward(());
        }

        // Check the user still exists and still holds the rights.
        match store.user(token.id).await {
            Ok(Some(user)) if user.rights >= R::RIGHTS => Outcome::Success(token),
            Ok(_) => Outcome::Forward(()),
            Err(e) => Outcome::Failure((Status::InternalServerError, e)),
        }
    }
}
