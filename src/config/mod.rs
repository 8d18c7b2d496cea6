//! Typed configuration from environment variables.
//!
//! Loads once at startup and fails fast on malformed values. Account
//! credentials live in a separate TOML file (see [`logins`]) and are wrapped
//! in `secrecy::SecretString` to prevent log leaks.

pub mod logins;
pub mod secrets;

pub use logins::{LoginConfig, LoginRegistry};

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::pool::WorkerSettings;

#[derive(Debug, Clone)]
pub struct Config {
    pub logins_file: PathBuf,
    /// Minimum spacing between requests on one session.
    pub request_delay: Duration,
    /// How long a request may wait for its response.
    pub request_ttl: Duration,
    /// Upper bound on the random delay before each extra account logs on.
    pub login_stagger: Duration,
    /// Periodic relog; `None` when `RELOG_INTERVAL_SECS=0`.
    pub relog_interval: Option<Duration>,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let relog_secs: u64 = parse_var("RELOG_INTERVAL_SECS", 1800)?;

        Ok(Self {
            logins_file: std::env::var("LOGINS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("logins.toml")),
            request_delay: Duration::from_millis(parse_var("REQUEST_DELAY_MS", 1100)?),
            request_ttl: Duration::from_millis(parse_var("REQUEST_TTL_MS", 5000)?),
            login_stagger: Duration::from_secs(parse_var("LOGIN_STAGGER_SECS", 240)?),
            relog_interval: (relog_secs > 0).then(|| Duration::from_secs(relog_secs)),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Base worker timing. The pool adds per-worker log-on and relog jitter.
    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            request_delay: self.request_delay,
            request_ttl: self.request_ttl,
            login_delay: Duration::ZERO,
            relog_interval: self.relog_interval,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{name} must be a number, got {raw:?}"))),
        Err(_) => Ok(default),
    }
}
