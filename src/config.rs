use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::engine::EngineOptions;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,
    pub db_max_connections: u32,

    // Rate limiting
    pub rate_ingest_per_min: u32,
    pub rate_query_per_min: u32,

    // Identity cache, 0 disables it
    pub tag_cache_ttl_secs: u64,
    pub tag_cache_capacity: u64,

    pub api_prefix: String,
    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            db_max_connections: parsed("DB_MAX_CONNECTIONS", 10)?,

            rate_ingest_per_min: parsed("RATE_INGEST_PER_MIN", 600)?,
            rate_query_per_min: parsed("RATE_QUERY_PER_MIN", 120)?,

            tag_cache_ttl_secs: parsed("TAG_CACHE_TTL_SECS", 0)?,
            tag_cache_capacity: parsed("TAG_CACHE_CAPACITY", 10_000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        })
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            tag_cache_ttl: Duration::from_secs(self.tag_cache_ttl_secs),
            tag_cache_capacity: self.tag_cache_capacity,
        }
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{name} must be set"))
}

fn parsed<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} is not a valid number: `{raw}`")),
        Err(_) => Ok(default),
    }
}
