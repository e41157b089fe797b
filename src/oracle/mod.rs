//! Exchange rate oracle
//!
//! The ledger only depends on the [`RateOracle`] contract. Two implementations
//! exist: the built-in static rate table and an HTTP client for a remote
//! conversion service. Which one is used is decided by configuration.

mod error;
mod http;
mod static_table;

pub use error::OracleError;
pub use http::HttpRateOracle;
pub use static_table::StaticRateTable;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, OracleKind};
use crate::domain::Currency;

/// Converts an amount between currencies.
///
/// Results are raw decimals; callers quantize them to money precision.
#[async_trait]
pub trait RateOracle: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Convert `amount` of `from` into `to`
    async fn convert(
        &self,
        from: &Currency,
        to: &Currency,
        amount: Decimal,
    ) -> Result<Decimal, OracleError>;
}

/// Build the oracle selected by configuration
pub fn from_config(config: &Config) -> Result<Arc<dyn RateOracle>, OracleError> {
    match &config.rate_oracle {
        OracleKind::Static => Ok(Arc::new(StaticRateTable::with_defaults())),
        OracleKind::Http { base_url } => {
            let timeout = Duration::from_millis(config.rate_oracle_timeout_ms);
            Ok(Arc::new(HttpRateOracle::new(base_url.clone(), timeout)?))
        }
    }
}
