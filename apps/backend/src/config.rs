//! Process configuration loaded from the environment

use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};

/// Server configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    /// New cards served per notebook in one study session
    pub new_card_cap: i64,
    /// Upper bound for the `limit` query parameter on listings
    pub study_limit_max: i64,
}

impl AppConfig {
    /// Read configuration from environment variables (after `.env` is loaded)
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        Ok(Self {
            database_url,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 3000)?,
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 10)?,
            new_card_cap: parse_var("NEW_CARD_CAP", 20)?,
            study_limit_max: parse_var("STUDY_LIMIT_MAX", 100)?,
        })
    }

    /// Configuration for a given database with every other value defaulted
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_connections: 10,
            new_card_cap: 20,
            study_limit_max: 100,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", name, value)),
        Err(_) => Ok(default),
    }
}
