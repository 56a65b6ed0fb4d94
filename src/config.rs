use std::sync::Arc;

use chrono::Duration;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{
    api::auth::Credentials,
    db::user::ensure_admin_exists,
    memory::MemoryStore,
    mongodb::MongoStore,
    store::Store,
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    #[serde(default = "default_index_size")]
    index_size: usize,
    // secrets
    jwt_secret: String,
}

fn default_index_size() -> usize {
    5
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// How many questions the index lists.
    pub fn index_size(&self) -> usize {
        self.index_size
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the store.
#[derive(Deserialize)]
struct StoreConfig {
    // secrets
    db_uri: Option<String>,
    // non-secrets
    #[serde(default = "default_db_name")]
    db_name: String,
    admin_username: Option<String>,
    // secrets
    admin_password: Option<String>,
}

fn default_db_name() -> String {
    "polls".to_string()
}

impl StoreConfig {
    /// The admin account to create if there are none.
    fn admin(&self) -> Option<Credentials> {
        Some(Credentials {
            username: self.admin_username.clone()?,
            password: self.admin_password.clone()?,
        })
    }
}

/// A fairing that connects to MongoDB if `db_uri` is set, falling back to an
/// in-memory store otherwise. Ensures an admin exists, then places the
/// [`Store`] into managed state.
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<StoreConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load store config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let store: Store = match config.db_uri {
            Some(ref uri) => {
                info!("Loaded database config, connecting...");
                match MongoStore::connect(uri, &config.db_name).await {
                    Ok(store) => {
                        info!("...database connection online!");
                        Arc::new(store)
                    }
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                }
            }
            None => {
                warn!("No `db_uri` configured, keeping everything in memory");
                Arc::new(MemoryStore::new())
            }
        };

        if let Err(e) = ensure_admin_exists(&*store, config.admin()).await {
            error!("Failed to set up admin account: {e}");
            return Err(rocket);
        }

        Ok(rocket.manage(store))
    }
}
