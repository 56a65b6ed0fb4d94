use rocket::{
    response::{Flash, Redirect},
    serde::json::Json,
    Route,
};

pub mod admin;
pub mod auth;
pub mod polls;

/// A document, or a redirect elsewhere with a message explaining why.
pub type Page<T> = std::result::Result<Json<T>, Flash<Redirect>>;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(auth::routes());
    routes.extend(polls::routes());
    routes
}
