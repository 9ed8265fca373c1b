//! Server configuration read from the environment.

use std::net::SocketAddr;
use thiserror::Error;

/// Address used when `SERVER_ADDR` is unset
pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid SERVER_ADDR {value:?}: {source}")]
    InvalidAddr {
        value: String,
        source: std::net::AddrParseError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the websocket listener binds to
    pub addr: SocketAddr,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_addr(std::env::var("SERVER_ADDR").ok())
    }

    fn from_addr(value: Option<String>) -> Result<Self, ConfigError> {
        let value = value.unwrap_or_else(|| DEFAULT_ADDR.into());
        let addr = value
            .parse()
            .map_err(|source| ConfigError::InvalidAddr { value, source })?;
        Ok(Self { addr })
    }
}
