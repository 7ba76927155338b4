//! Runtime configuration.
//!
//! The store connection is read once from the environment (optionally via a
//! `.env` file) and passed by reference to the store client.

use std::env;
use std::fmt;

use crate::error::ConfigError;

pub const PROTOCOL_VAR: &str = "POSTGREST_PROTOCOL";
pub const HOST_VAR: &str = "POSTGREST_HOST";
pub const PORT_VAR: &str = "POSTGREST_PORT";
pub const USERNAME_VAR: &str = "ADMIN_USERNAME";
pub const PASSPHRASE_VAR: &str = "ADMIN_PASSPHRASE";

/// Connection settings for the PostgREST data store.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub passphrase: String,
}

impl StoreConfig {
    pub fn new(
        protocol: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            host: host.into(),
            port,
            username: username.into(),
            passphrase: passphrase.into(),
        }
    }

    /// Read the configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup (environment, map in tests...).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| lookup(key).ok_or(ConfigError::MissingVar(key));

        let raw_port = get(PORT_VAR)?;
        let port = raw_port
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort(raw_port.clone()))?;

        Ok(Self {
            protocol: get(PROTOCOL_VAR)?,
            host: get(HOST_VAR)?,
            port,
            username: get(USERNAME_VAR)?,
            passphrase: get(PASSPHRASE_VAR)?,
        })
    }

    /// `protocol://host:port`
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    /// Full URL of a store path, e.g. `rpc/login` or `libraries`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url(), path.trim_start_matches('/'))
    }
}

// Keep the passphrase out of logs.
impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("passphrase", &"***")
            .finish()
    }
}
