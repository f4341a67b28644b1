use std::{
    fmt::{self, Display},
    net::{IpAddr, SocketAddr},
};

use crate::constants::{DEFAULT_HOST, DEFAULT_MAX_CONNECTIONS, DEFAULT_PORT};

/// Settings shared with the identity provider.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// HMAC-SHA256 key bearer tokens are signed with
    pub secret: String,
    /// Required `iss` claim, not checked when unset
    pub issuer: Option<String>,
}

/// Process configuration, built once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    pub auth: AuthConfig,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing environment variable {key}"),
            ConfigError::Invalid(key, value) => {
                write!(f, "invalid value for {key}: {value:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let host = lookup("RECIVAULT_HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let host: IpAddr = host
            .parse()
            .map_err(|_| ConfigError::Invalid("RECIVAULT_HOST", host))?;

        let port = match lookup("RECIVAULT_PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| ConfigError::Invalid("RECIVAULT_PORT", port))?,
            None => DEFAULT_PORT,
        };

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid("DATABASE_MAX_CONNECTIONS", value))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            host,
            port,
            database_url: required("DATABASE_URI")?,
            max_connections,
            auth: AuthConfig {
                secret: required("RECIVAULT_JWT_SECRET")?,
                issuer: lookup("RECIVAULT_JWT_ISSUER").filter(|v| !v.is_empty()),
            },
        })
    }

    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
