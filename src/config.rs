//! Server configuration loaded from environment variables.
//!
//! Every knob has a default except `DATABASE_URL`. A `.env` file in the
//! working directory is honored (loaded by `main` before this runs).

use std::time::Duration;

use crate::services::cursor::ACTIVE_WINDOW;

const DEFAULT_PORT: u16 = 2022;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_CURSOR_REAP_INTERVAL_SECS: u64 = 60;
const DEFAULT_CURSOR_RETENTION_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} required")]
    Missing(&'static str),
    #[error("invalid {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Tuning knobs for the stale-cursor reaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaperConfig {
    /// Time between sweeps. `None` disables the reaper.
    pub interval: Option<Duration>,
    /// Idle time after which a cursor row is deleted. Never below [`ACTIVE_WINDOW`].
    pub retention: Duration,
}

impl ReaperConfig {
    #[must_use]
    pub fn new(interval_secs: u64, retention_secs: u64) -> Self {
        let interval = (interval_secs > 0).then(|| Duration::from_secs(interval_secs));
        let retention = Duration::from_secs(retention_secs).max(ACTIVE_WINDOW);
        Self { interval, retention }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub reaper: ReaperConfig,
}

impl ServerConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `Missing` when `DATABASE_URL` is unset and `Invalid` when the
    /// port does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let port = match lookup("PORT").or_else(|| lookup("SERVER_PORT")) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value: raw })?,
            None => DEFAULT_PORT,
        };

        let reaper = ReaperConfig::new(
            env_parse(&lookup, "CURSOR_REAP_INTERVAL_SECS", DEFAULT_CURSOR_REAP_INTERVAL_SECS),
            env_parse(&lookup, "CURSOR_RETENTION_SECS", DEFAULT_CURSOR_RETENTION_SECS),
        );

        Ok(Self {
            database_url,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned()),
            port,
            db_max_connections: env_parse(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            reaper,
        })
    }

    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// Parse an optional tuning knob, falling back to `default` when unset or malformed.
fn env_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
