//! Service configuration read from the environment.
//!
//! - `PORT` - HTTP port (default: 3000)
//! - `IRIS_MAX_LIMIT` - largest accepted page size (default: 1000)
//! - database settings, see [`irisfinder_lib::DatabaseConfig`]

use irisfinder_lib::{DatabaseConfig, Error, Result};

/// Port used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3000;

/// Page size cap used when `IRIS_MAX_LIMIT` is unset.
pub const DEFAULT_MAX_LIMIT: u32 = 1000;

/// Everything the binary needs to start serving.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub max_limit: u32,
    pub database: DatabaseConfig,
}

impl ServiceConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| Error::invalid_config("PORT", value.clone(), "not a port number"))?,
            None => DEFAULT_PORT,
        };

        let max_limit = match lookup("IRIS_MAX_LIMIT") {
            Some(value) => match value.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(Error::invalid_config(
                        "IRIS_MAX_LIMIT",
                        value,
                        "expected a positive integer",
                    ))
                }
            },
            None => DEFAULT_MAX_LIMIT,
        };

        let database = DatabaseConfig::from_lookup(&lookup)?;

        Ok(Self {
            port,
            max_limit,
            database,
        })
    }
}
