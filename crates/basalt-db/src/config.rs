use std::env;

use serde::{Deserialize, Serialize};

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_database() -> String {
    "basalt".to_string()
}

fn default_user() -> String {
    "postgres".to_string()
}

/// Process-wide connection configuration, usually read from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Maximum pool size. Defaults to the pool library's default.
    #[serde(default)]
    pub pool_max: Option<usize>,
    #[serde(default)]
    pub idle_timeout_secs: Option<u64>,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: default_database(),
            user: default_user(),
            password: String::new(),
            pool_max: None,
            idle_timeout_secs: None,
            connect_timeout_secs: None,
        }
    }
}

impl DatabaseConfig {
    /// Read configuration from `BASALT_PG_*` environment variables, falling
    /// back to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        Self {
            host: env::var("BASALT_PG_HOST").unwrap_or_else(|_| default_host()),
            port: env_parse("BASALT_PG_PORT").unwrap_or_else(default_port),
            database: env::var("BASALT_PG_DATABASE").unwrap_or_else(|_| default_database()),
            user: env::var("BASALT_PG_USER").unwrap_or_else(|_| default_user()),
            password: env::var("BASALT_PG_PASSWORD").unwrap_or_default(),
            pool_max: env_parse("BASALT_PG_POOL_MAX"),
            idle_timeout_secs: env_parse("BASALT_PG_IDLE_TIMEOUT_SECS"),
            connect_timeout_secs: env_parse("BASALT_PG_CONNECT_TIMEOUT_SECS"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
