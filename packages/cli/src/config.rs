// ABOUTME: Server configuration loaded from the environment
// ABOUTME: Typed errors for malformed values; command-line flags override these afterwards

use std::env;
use std::net::IpAddr;
use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

use ecflow_core::{default_database_path, DEFAULT_ACTIVITY_LIMIT, MAX_ACTIVITY_LIMIT};

pub const DEFAULT_PORT: u16 = 4100;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port number: {0}")]
    InvalidPort(#[from] ParseIntError),
    #[error("Port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u16),
    #[error("Invalid host address: {0}")]
    InvalidHost(String),
    #[error("Activity limit must be a number between 1 and {max}, got {value}")]
    InvalidActivityLimit { value: String, max: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub host: IpAddr,
    pub cors_origin: String,
    pub database_path: PathBuf,
    pub activity_limit: i64,
}

impl Config {
    /// Read the process environment after loading `.env` when one exists
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(value) => value.trim().parse::<u16>()?,
            None => DEFAULT_PORT,
        };
        if port == 0 {
            return Err(ConfigError::PortOutOfRange(port));
        }

        let host_str = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let host = host_str
            .trim()
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::InvalidHost(host_str.clone()))?;

        let cors_origin = lookup("CORS_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string());

        let database_path = lookup("ECFLOW_DATABASE_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);

        let activity_limit = match lookup("ECFLOW_ACTIVITY_LIMIT") {
            Some(value) => parse_activity_limit(&value)?,
            None => DEFAULT_ACTIVITY_LIMIT,
        };

        Ok(Config {
            port,
            host,
            cors_origin,
            database_path,
            activity_limit,
        })
    }
}

fn parse_activity_limit(value: &str) -> Result<i64, ConfigError> {
    let invalid = || ConfigError::InvalidActivityLimit {
        value: value.to_string(),
        max: MAX_ACTIVITY_LIMIT,
    };
    let limit = value.trim().parse::<i64>().map_err(|_| invalid())?;
    if !(1..=MAX_ACTIVITY_LIMIT).contains(&limit) {
        return Err(invalid());
    }
    Ok(limit)
}
