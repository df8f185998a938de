//! Configuration for the Products CLI

use core_config::{DatabaseConfig, FromEnv};

pub use core_config::Environment;

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub database: DatabaseConfig,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        Ok(Self {
            database: DatabaseConfig::from_env()?,
            environment: Environment::from_env(),
        })
    }
}
