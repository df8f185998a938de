//! SeaORM connection helpers
//!
//! Pool options from [`core_config::DatabaseConfig`], connecting with
//! exponential backoff, and running a migrator against the connection.
//!
//! ```ignore
//! use core_config::{DatabaseConfig, FromEnv};
//! use migration::Migrator;
//!
//! let config = DatabaseConfig::from_env()?;
//! let db = database::connect_with_retry(&config, None).await?;
//! database::run_migrations::<Migrator>(&db).await?;
//! ```

pub mod common;
mod connector;

pub use common::{retry_with_backoff, DatabaseError, DatabaseResult, RetryConfig};
pub use connector::{connect, connect_options, connect_with_retry, run_migrations};

// Re-export SeaORM types for convenience
pub use sea_orm::{ConnectOptions, DatabaseConnection, DbErr};
