use core_config::DatabaseConfig;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{info, instrument};

use crate::common::{retry_with_backoff, DatabaseError, DatabaseResult, RetryConfig};

/// Translate pool settings into SeaORM connect options
pub fn connect_options(config: &DatabaseConfig) -> ConnectOptions {
    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(config.sql_logging);
    opt
}

/// Open a connection pool, single attempt
///
/// Works for any backend SeaORM is built with here (`postgres://...`,
/// `sqlite::memory:`).
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(connect_options(config)).await?;
    info!(backend = ?db.get_database_backend(), "Connected to database");
    Ok(db)
}

/// Connect, retrying with exponential backoff
///
/// `None` uses [`RetryConfig::default`].
#[instrument(skip_all)]
pub async fn connect_with_retry(
    config: &DatabaseConfig,
    retry: Option<RetryConfig>,
) -> DatabaseResult<DatabaseConnection> {
    retry_with_backoff(|| connect(config), retry.unwrap_or_default())
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))
}

/// Bring the schema up to date with every pending migration of `M`
#[instrument(skip_all)]
pub async fn run_migrations<M: MigratorTrait>(db: &DatabaseConnection) -> DatabaseResult<()> {
    info!("Running database migrations...");
    M::up(db, None)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;
    info!("Migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_memory() -> DatabaseConfig {
        DatabaseConfig::new("sqlite::memory:").with_pool_size(1, 1)
    }

    #[test]
    fn test_connect_options_carry_pool_settings() {
        let config = DatabaseConfig::new("postgres://localhost/catalog").with_pool_size(20, 2);

        let options = connect_options(&config);

        assert_eq!(options.get_url(), "postgres://localhost/catalog");
        assert_eq!(options.get_max_connections(), Some(20));
        assert_eq!(options.get_min_connections(), Some(2));
        assert_eq!(options.get_connect_timeout(), Some(Duration::from_secs(8)));
    }

    #[tokio::test]
    async fn test_connect_to_sqlite_memory() {
        let db = connect(&sqlite_memory()).await.unwrap();

        assert!(db.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_connect_with_retry_gives_up_on_bad_url() {
        let config = DatabaseConfig::new("unknown://nowhere");
        let retry = RetryConfig::new()
            .with_max_retries(1)
            .with_initial_delay(1)
            .without_jitter();

        let result = connect_with_retry(&config, Some(retry)).await;

        assert!(matches!(result, Err(DatabaseError::ConnectionFailed(_))));
    }
}
