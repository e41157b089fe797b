//! Configuration module
//!
//! Loads configuration from environment variables.

use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

use crate::domain::{Amount, Currency};

/// Ledger persistence backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String },
    Memory,
}

/// Rate oracle implementation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleKind {
    Static,
    Http { base_url: String },
}

/// How the credited amount of a cross-currency transfer is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionPolicy {
    /// Both legs converted independently from the requested currency
    #[default]
    IndependentLegs,
    /// Credit leg converted from the debited amount (one rate between the parties)
    SenderAnchored,
}

impl FromStr for ConversionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "independent_legs" => Ok(ConversionPolicy::IndependentLegs),
            "sender_anchored" => Ok(ConversionPolicy::SenderAnchored),
            _ => Err(ConfigError::InvalidValue("CONVERSION_POLICY")),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreBackend,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    pub rate_oracle: OracleKind,

    /// Timeout for the HTTP oracle, in milliseconds
    pub rate_oracle_timeout_ms: u64,

    pub conversion_policy: ConversionPolicy,

    /// Seed granted to every new account, before conversion
    pub starting_balance: Amount,

    pub starting_currency: Currency,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let store = match env_or("STORE_BACKEND", "postgres").as_str() {
            "postgres" => StoreBackend::Postgres {
                database_url: env::var("DATABASE_URL")
                    .map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?,
            },
            "memory" => StoreBackend::Memory,
            _ => return Err(ConfigError::InvalidValue("STORE_BACKEND")),
        };

        let database_max_connections = env_or("DATABASE_MAX_CONNECTIONS", "10")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = env_or("HOST", "127.0.0.1");

        let port = env_or("PORT", "3000")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = env_or("ENVIRONMENT", "development");

        let rate_oracle = match env_or("RATE_ORACLE", "static").as_str() {
            "static" => OracleKind::Static,
            "http" => OracleKind::Http {
                base_url: env::var("RATE_ORACLE_URL")
                    .map_err(|_| ConfigError::MissingEnv("RATE_ORACLE_URL"))?,
            },
            _ => return Err(ConfigError::InvalidValue("RATE_ORACLE")),
        };

        let rate_oracle_timeout_ms = env_or("RATE_ORACLE_TIMEOUT_MS", "5000")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("RATE_ORACLE_TIMEOUT_MS"))?;

        let conversion_policy = env_or("CONVERSION_POLICY", "independent_legs").parse()?;

        let starting_balance = Decimal::from_str(&env_or("STARTING_BALANCE", "1000"))
            .ok()
            .and_then(|value| Amount::new(value).ok())
            .ok_or(ConfigError::InvalidValue("STARTING_BALANCE"))?;

        let starting_currency = Currency::new(&env_or("STARTING_CURRENCY", "GBP"))
            .map_err(|_| ConfigError::InvalidValue("STARTING_CURRENCY"))?;

        Ok(Self {
            store,
            database_max_connections,
            host,
            port,
            environment,
            rate_oracle,
            rate_oracle_timeout_ms,
            conversion_policy,
            starting_balance,
            starting_currency,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
