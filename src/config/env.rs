//! Process configuration from environment variables.

use crate::error::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Bounded retry with a fixed interval between attempts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            interval: Duration::from_secs(10),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

#[derive(Clone, Debug)]
pub struct ProxyConfig {
    pub database: DatabaseConfig,
    pub listen_port: u16,
    pub schema_path: PathBuf,
    pub retry: RetryPolicy,
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = RetryPolicy::default();
        let database = DatabaseConfig {
            host: lookup("DB_HOST").unwrap_or_else(|| "host.docker.internal".into()),
            port: parse_or(&lookup, "DB_PORT", 3306)?,
            user: lookup("DB_USER").unwrap_or_else(|| "root".into()),
            password: lookup("DB_PASSWORD").unwrap_or_default(),
            database: lookup("MYSQL_DATABASE").ok_or(ConfigError::MissingVar("MYSQL_DATABASE"))?,
        };
        let listen_port = match lookup("DBPROXY_PORT") {
            Some(v) => parse_var("DBPROXY_PORT", v)?,
            None => return Err(ConfigError::MissingVar("DBPROXY_PORT")),
        };
        let max_attempts: u32 = parse_or(&lookup, "DBPROXY_CONNECT_ATTEMPTS", defaults.max_attempts)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidVar {
                name: "DBPROXY_CONNECT_ATTEMPTS",
                value: "0".into(),
            });
        }
        let interval_secs: u64 = parse_or(&lookup, "DBPROXY_CONNECT_INTERVAL_SECS", defaults.interval.as_secs())?;

        Ok(ProxyConfig {
            database,
            listen_port,
            schema_path: lookup("DBPROXY_SCHEMA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("schema.json")),
            retry: RetryPolicy {
                max_attempts,
                interval: Duration::from_secs(interval_secs),
            },
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidVar { name, value })
}

fn parse_or<T, F>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(v) => parse_var(name, v),
        None => Ok(default),
    }
}
