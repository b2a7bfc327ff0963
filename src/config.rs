use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::application::cart_store::DEFAULT_IDLE_TTL;
use crate::application::pricing::PricingPolicy;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres { database_url: String },
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub storage: StorageBackend,
    pub pricing_policy: PricingPolicy,
    /// How long an untouched cart is kept before it is swept.
    pub cart_idle_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = match lookup("PORT") {
            None => 8080,
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value })?,
        };

        let storage = match lookup("STORAGE_BACKEND").as_deref().unwrap_or("postgres") {
            "postgres" => StorageBackend::Postgres {
                database_url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            },
            "memory" => StorageBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORAGE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let pricing_policy = match lookup("PRICE_POLICY") {
            None => PricingPolicy::default(),
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "PRICE_POLICY", value })?,
        };

        let cart_idle_ttl = match lookup("CART_IDLE_TTL_SECS") {
            None => DEFAULT_IDLE_TTL,
            Some(value) => value
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::Invalid { key: "CART_IDLE_TTL_SECS", value })?,
        };

        Ok(Self {
            host,
            port,
            storage,
            pricing_policy,
            cart_idle_ttl,
        })
    }
}
