use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_DB_PATH: &str = "insights.db";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_path: PathBuf,
    pub bind_addr: SocketAddr,
    /// Seed for interaction sampling; unset means a fresh random draw per request.
    pub sample_seed: Option<u64>,
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_path = get("INSIGHTS_DB_PATH")
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string())
            .into();

        let bind_addr = get("INSIGHTS_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("INSIGHTS_BIND_ADDR must be a socket address")?;

        let sample_seed = get("INSIGHTS_SAMPLE_SEED")
            .map(|s| s.parse::<u64>())
            .transpose()
            .context("INSIGHTS_SAMPLE_SEED must be an unsigned integer")?;

        Ok(Config {
            database_path,
            bind_addr,
            sample_seed,
        })
    }
}

pub fn load_config() -> Result<Config> {
    Config::new()
}
