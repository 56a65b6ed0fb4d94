#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{figment::Figment, Build, Rocket};

use crate::config::{ConfigFairing, StoreFairing};
use crate::logging::LoggerFairing;
use crate::model::store::Store;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod voting;

/// Build the server from `Rocket.toml` and `ROCKET_*` environment variables.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(ConfigFairing)
        .attach(StoreFairing)
        .attach(LoggerFairing)
        .mount("/", api::routes())
}

/// Build the server with the given configuration around an existing store.
pub fn rocket_for_store(figment: Figment, store: Store) -> Rocket<Build> {
    rocket::custom(figment)
        .attach(ConfigFairing)
        .attach(LoggerFairing)
        .manage(store)
        .mount("/", api::routes())
}

/// Configuration for tests, independent of `Rocket.toml` and the environment.
#[cfg(test)]
pub(crate) fn test_figment() -> Figment {
    Figment::from(rocket::Config::debug_default())
        .merge(("jwt_secret", "test-only secret, never use in production"))
        .merge(("auth_ttl", 3600))
        .merge(("index_size", 5))
        .merge(("log_level", "off"))
}
