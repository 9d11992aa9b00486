use std::{env, fmt::Display, net::SocketAddr, str::FromStr};

use anyhow::anyhow;
use tracing::info;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://polls.db?mode=rwc";
pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";
/// Two weeks.
pub const DEFAULT_SESSION_AGE_SECS: &str = "1209600";
pub const DEFAULT_MAX_CONNECTIONS: &str = "5";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub addr: SocketAddr,
    pub session_age_secs: i64,
    pub max_connections: u32,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: try_load("DATABASE_URL", DEFAULT_DATABASE_URL)?,
            addr: try_load("POLLS_ADDR", DEFAULT_ADDR)?,
            session_age_secs: try_load("SESSION_AGE_SECS", DEFAULT_SESSION_AGE_SECS)?,
            max_connections: try_load("DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}"))
}
