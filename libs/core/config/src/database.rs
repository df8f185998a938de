use crate::{env_parse_or, env_required, ConfigError, FromEnv};

/// Database configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    /// Log every statement SeaORM sends
    pub sql_logging: bool,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 8,
            sql_logging: false,
        }
    }

    /// Override the pool bounds
    pub fn with_pool_size(mut self, max_connections: u32, min_connections: u32) -> Self {
        self.max_connections = max_connections;
        self.min_connections = min_connections;
        self
    }
}

impl FromEnv for DatabaseConfig {
    /// Requires DATABASE_URL to be set (no default); pool settings are optional:
    /// - DATABASE_MAX_CONNECTIONS: defaults to 10
    /// - DATABASE_MIN_CONNECTIONS: defaults to 1
    /// - DATABASE_CONNECT_TIMEOUT_SECS: defaults to 8
    /// - DATABASE_SQL_LOGGING: defaults to false
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::new(env_required("DATABASE_URL")?);

        Ok(Self {
            max_connections: env_parse_or("DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
            min_connections: env_parse_or("DATABASE_MIN_CONNECTIONS", defaults.min_connections)?,
            connect_timeout_secs: env_parse_or(
                "DATABASE_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_secs,
            )?,
            sql_logging: env_parse_or("DATABASE_SQL_LOGGING", defaults.sql_logging)?,
            ..defaults
        })
    }
}
