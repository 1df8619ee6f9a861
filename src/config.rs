//! Environment configuration (`.env` is loaded by the binary with dotenvy)

use std::path::PathBuf;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Postgres connection string. Without it the in-memory backend is used.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub run_migrations: bool,
    pub nats_url: Option<String>,
    pub port: u16,
    /// JSON file with products and users for the in-memory backend
    pub seed_file: Option<PathBuf>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Self { database_url: None, max_connections: 10, run_migrations: true, nats_url: None, port: 8083, seed_file: None }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Ok(Self {
            database_url: var("DATABASE_URL"),
            max_connections: parse(&var, "DATABASE_MAX_CONNECTIONS")?.unwrap_or(defaults.max_connections),
            run_migrations: parse(&var, "RUN_MIGRATIONS")?.unwrap_or(defaults.run_migrations),
            nats_url: var("NATS_URL"),
            port: parse(&var, "PORT")?.unwrap_or(defaults.port),
            seed_file: var("STOREFRONT_SEED_FILE").map(PathBuf::from),
        })
    }
}

fn parse<T: std::str::FromStr>(var: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<Option<T>, ConfigError> {
    var(name).map(|value| value.trim().parse().map_err(|_| ConfigError::Invalid { name, value })).transpose()
}
