use std::net::IpAddr;

use rocket::{
    http::{uri::Origin, Cookie, CookieJar, Status},
    request::FlashMessage,
    response::Redirect,
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    error::{Error, Result},
    logging::{AuthEvent, RequestId},
    model::{
        api::{
            auth::{AuthToken, Credentials, Rights, Voter, AUTH_TOKEN_COOKIE},
            page::LoginPage,
            Message,
        },
        store::{Store, UserStore},
    },
};

use super::polls;

pub fn routes() -> Vec<Route> {
    routes![signup, login_page, login, logout]
}

/// The path to return to after logging in, if it is a path on this site.
fn local_path(next: Option<&str>) -> Option<Origin<'static>> {
    let next = next?;
    if !next.starts_with('/') || next.starts_with("//") || next.contains('\\') {
        return None;
    }
    Origin::parse_owned(next.to_string()).ok()
}

#[post("/auth/signup", data = "<credentials>", format = "json")]
pub async fn signup(
    credentials: Json<Credentials>,
    cookies: &CookieJar<'_>,
    store: &State<Store>,
    config: &State<Config>,
    request_id: &RequestId,
    ip: Option<IpAddr>,
) -> Result<Redirect> {
    let user = credentials.into_inner().into_user(Rights::Voter)?;
    let user = store.insert_user(user).await?;

    cookies.add(AuthToken::<Voter>::new(&user).into_cookie(config)?);
    AuthEvent::SignedUp {
        username: &user.username,
    }
    .log(request_id, ip);

    Ok(Redirect::to(uri!(polls::index)))
}

#[get("/auth/login?<next>")]
pub fn login_page(next: Option<String>, flash: Option<FlashMessage<'_>>) -> Json<LoginPage> {
    Json(LoginPage {
        next,
        message: flash.map(Message::from),
    })
}

#[post("/auth/login?<next>", data = "<credentials>", format = "json")]
pub async fn login(
    next: Option<String>,
    credentials: Json<Credentials>,
    cookies: &CookieJar<'_>,
    store: &State<Store>,
    config: &State<Config>,
    request_id: &RequestId,
    ip: Option<IpAddr>,
) -> Result<Redirect> {
    let user = store
        .user_by_name(&credentials.username)
        .await?
        .filter(|user| user.verify_password(&credentials.password));
    let Some(user) = user else {
        AuthEvent::LoginFailed {
            username: &credentials.username,
        }
        .log(request_id, ip);
        return Err(Error::Unauthorized(
            "No user found with the provided username and password combination.".to_string(),
        ));
    };

    cookies.add(AuthToken::<Voter>::new(&user).into_cookie(config)?);
    AuthEvent::LoggedIn {
        username: &user.username,
    }
    .log(request_id, ip);

    Ok(match local_path(next.as_deref()) {
        Some(path) => Redirect::to(path),
        None => Redirect::to(uri!(polls::index)),
    })
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar<'_>, request_id: &RequestId, ip: Option<IpAddr>) -> Status {
    if cookies.get(AUTH_TOKEN_COOKIE).is_some() {
        AuthEvent::LoggedOut.log(request_id, ip);
    }
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}
