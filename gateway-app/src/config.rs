//! Configuration loading from environment.

use std::env;

use anyhow::Context;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATABASE_URL: &str = "memory://";
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 100;

/// Application configuration.
#[derive(Debug, PartialEq)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub rate_limit_per_minute: u32,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = match lookup("PORT") {
            Some(v) => v.parse().with_context(|| format!("invalid PORT: {v}"))?,
            None => DEFAULT_PORT,
        };

        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let rate_limit_per_minute = match lookup("RATE_LIMIT_PER_MINUTE") {
            Some(v) => v
                .parse()
                .with_context(|| format!("invalid RATE_LIMIT_PER_MINUTE: {v}"))?,
            None => DEFAULT_RATE_LIMIT_PER_MINUTE,
        };

        Ok(Self {
            port,
            database_url,
            rate_limit_per_minute,
        })
    }
}
