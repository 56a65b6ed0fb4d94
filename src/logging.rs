use rocket::{
    fairing::{Fairing, Info, Kind},
    http::{Status, StatusClass},
    request::{FromRequest, Outcome},
    Data, Orbit, Request, Response, Rocket, Route,
};
use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Log target for sign-in activity.
pub const AUTH_TARGET: &str = "polls_backend::auth";

/// A unique identifier for a particular request.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct RequestId(pub usize);

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RequestId {
    /// Atomically get the next ID. This wraps around back to zero if you somehow exceed a usize.
    pub fn next() -> RequestId {
        static REQUEST_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);
        RequestId(REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Allow the ID to be accessed via request guard.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for &'r RequestId {
    type Error = std::convert::Infallible;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(req.local_cache(RequestId::next))
    }
}

/// Sign-in activity, reported on [`AUTH_TARGET`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent<'a> {
    SignedUp { username: &'a str },
    LoggedIn { username: &'a str },
    LoginFailed { username: &'a str },
    LoggedOut,
}

impl AuthEvent<'_> {
    /// Log this event for the request with the given ID, coming from `ip`.
    pub fn log(&self, id: &RequestId, ip: Option<IpAddr>) {
        let ip = ip.map_or_else(|| "unknown".to_string(), |ip| ip.to_string());
        match self {
            Self::SignedUp { username } => {
                log::info!(target: AUTH_TARGET, "req{id} user '{username}' signed up from {ip}")
            }
            Self::LoggedIn { username } => {
                log::info!(target: AUTH_TARGET, "req{id} user '{username}' logged in from {ip}")
            }
            Self::LoginFailed { username } => {
                log::warn!(target: AUTH_TARGET, "req{id} failed login for '{username}' from {ip}")
            }
            Self::LoggedOut => log::info!(target: AUTH_TARGET, "req{id} logged out from {ip}"),
        }
    }
}

/// When a request reached the server.
struct Received(Instant);

/// One line describing a finished request.
fn response_line(
    id: &RequestId,
    status: Status,
    route: Option<&Route>,
    location: Option<&str>,
    elapsed: Duration,
) -> String {
    let handler = route
        .and_then(|route| route.name.as_deref())
        .unwrap_or("unrouted");
    let mut line = format!("<-req{id} {status} from {handler}");
    if let Some(location) = location {
        line.push_str(&format!(" to {location}"));
    }
    line.push_str(&format!(" in {}ms", elapsed.as_millis()));
    line
}

/// Logs each request as it arrives and again as it is answered, tagged with
/// its [`RequestId`]. Redirects log their destination.
#[derive(Debug, Copy, Clone)]
pub struct LoggerFairing;

#[rocket::async_trait]
impl Fairing for LoggerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Request logger",
            kind: Kind::Liftoff | Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let config = rocket.config();
        let scheme = if config.tls_enabled() { "https" } else { "http" };
        info!("Polls open at {scheme}://{}:{}", config.address, config.port);
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        req.local_cache(|| Received(Instant::now()));
        let id = req.local_cache(RequestId::next);
        let client = req
            .client_ip()
            .map_or_else(|| "unknown client".to_string(), |ip| ip.to_string());
        info!("->req{id} {} {} ({client})", req.method(), req.uri());
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let id = req.local_cache(RequestId::next);
        let Received(received) = req.local_cache(|| Received(Instant::now()));
        let status = res.status();
        let line = response_line(
            id,
            status,
            req.route(),
            res.headers().get_one("Location"),
            received.elapsed(),
        );
        match status.class() {
            StatusClass::ServerError => error!("{line}"),
            StatusClass::ClientError => warn!("{line}"),
            _ => info!("{line}"),
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        warn!("Shutting down, no longer accepting votes");
    }
}

/// Send this crate's logs to the test harness's captured output.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    log4rs_test_utils::test_logging::init_logging_once_for(["polls_backend"], None, None);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_increase() {
        let first = RequestId::next();
        let second = RequestId::next();
        assert!(second > first);
    }

    #[test]
    fn response_lines() {
        let id = RequestId(7);
        assert_eq!(
            response_line(&id, Status::NotFound, None, None, Duration::from_millis(3)),
            "<-req7 404 Not Found from unrouted in 3ms"
        );
        assert_eq!(
            response_line(
                &id,
                Status::SeeOther,
                None,
                Some("/polls"),
                Duration::from_micros(20)
            ),
            "<-req7 303 See Other from unrouted to /polls in 0ms"
        );
    }

}
