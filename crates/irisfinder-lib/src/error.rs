use thiserror::Error;

/// Convenient result alias for the irisfinder library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A required environment variable was not set.
    #[error("missing required environment variable {name}")]
    MissingConfig { name: String },

    /// A configuration value could not be parsed.
    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidConfig {
        name: String,
        value: String,
        reason: String,
    },

    /// Raised when a configured table or column name is not a plain SQL identifier.
    #[error("invalid SQL identifier {value:?}; expected [A-Za-z_][A-Za-z0-9_]* (optionally schema-qualified)")]
    InvalidIdentifier { value: String },

    /// The connection string could not be parsed by the PostgreSQL driver.
    #[error("invalid database url")]
    InvalidDatabaseUrl(#[source] tokio_postgres::Error),

    /// The TLS client configuration could not be built.
    #[error("failed to configure database TLS: {reason}")]
    Tls { reason: String },

    /// The connection pool could not be constructed.
    #[error("failed to build database pool")]
    PoolBuild(#[from] deadpool_postgres::BuildError),

    /// No connection could be checked out of the pool.
    #[error("failed to acquire database connection")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// The spatial query failed on the server or on the wire.
    #[error("database query failed")]
    Query(#[from] tokio_postgres::Error),

    /// The aggregated result rows were not a JSON array of objects.
    #[error("failed to decode IRIS rows")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    /// Build an [`Error::InvalidConfig`] for the named setting.
    pub fn invalid_config(
        name: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Render the error together with its `source()` chain on one line.
    ///
    /// Useful for logging: driver errors hide the server message one level down.
    pub fn chain(&self) -> String {
        let mut rendered = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            rendered.push_str(": ");
            rendered.push_str(&err.to_string());
            source = err.source();
        }
        rendered
    }
}
