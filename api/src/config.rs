use std::net::SocketAddr;

const DEFAULT_MAX_CONNECTIONS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Env {
    Dev,
    Staging,
    Production,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Storage {
    Postgres {
        database_url: String,
        max_connections: usize,
    },
    Memory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub env: Env,
    pub storage: Storage,
    pub listen_addr: SocketAddr,
    pub log_format: LogFormat,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable `{0}` is required")]
    Missing(&'static str),

    #[error("Could not get the environment variable `{0}` due to unicode error")]
    NotUnicode(&'static str),

    #[error("Environment variable `{key}` has invalid value `{value}`: expected {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

fn var(key: &'static str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(env) => Ok(Some(env)),
        Err(std::env::VarError::NotPresent) => {
            tracing::debug!("Missing environment variable `{key}`, using the default");
            Ok(None)
        }
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(key)),
    }
}

fn parse_with<T>(
    key: &'static str,
    value: Option<String>,
    default: T,
    expected: &'static str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => parse(value.trim()).ok_or(ConfigError::Invalid {
            key,
            value,
            expected,
        }),
    }
}

impl ServerConfig {
    pub fn new_from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(var)
    }

    /// Builds the configuration from any key lookup, the process environment
    /// in production and a plain map in tests.
    pub fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&'static str) -> Result<Option<String>, ConfigError>,
    {
        let env = parse_with(
            "ENVIRONMENT",
            lookup("ENVIRONMENT")?,
            Env::Dev,
            "one of dev, staging, production",
            |v| match v {
                "dev" => Some(Env::Dev),
                "staging" => Some(Env::Staging),
                "production" => Some(Env::Production),
                _ => None,
            },
        )?;

        let use_memory = parse_with(
            "STORAGE",
            lookup("STORAGE")?,
            false,
            "one of postgres, memory",
            |v| match v {
                "postgres" => Some(false),
                "memory" => Some(true),
                _ => None,
            },
        )?;

        let storage = if use_memory {
            Storage::Memory
        } else {
            let database_url = lookup("DATABASE_URL")?.ok_or(ConfigError::Missing("DATABASE_URL"))?;
            let max_connections = parse_with(
                "DATABASE_MAX_CONNECTIONS",
                lookup("DATABASE_MAX_CONNECTIONS")?,
                DEFAULT_MAX_CONNECTIONS,
                "a positive integer",
                |v| v.parse().ok().filter(|n: &usize| *n > 0),
            )?;
            Storage::Postgres {
                database_url,
                max_connections,
            }
        };

        let listen_addr = parse_with(
            "LISTEN_ADDR",
            lookup("LISTEN_ADDR")?,
            SocketAddr::from(([0, 0, 0, 0], 3000)),
            "a socket address such as 0.0.0.0:3000",
            |v| v.parse().ok(),
        )?;

        let default_format = match env {
            Env::Production => LogFormat::Json,
            Env::Dev | Env::Staging => LogFormat::Pretty,
        };
        let log_format = parse_with(
            "LOG_FORMAT",
            lookup("LOG_FORMAT")?,
            default_format,
            "one of pretty, json",
            |v| match v {
                "pretty" => Some(LogFormat::Pretty),
                "json" => Some(LogFormat::Json),
                _ => None,
            },
        )?;

        Ok(ServerConfig {
            env,
            storage,
            listen_addr,
            log_format,
        })
    }
}
