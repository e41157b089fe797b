//! Static rate table
//!
//! Fixed multiplicative rates, used when no remote oracle is configured and
//! served over HTTP by the `/conversion` endpoint.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

use super::{OracleError, RateOracle};
use crate::domain::{round_money, Currency};

/// Default rates as (from, to, rate scaled by 100)
fn default_rates() -> [(Currency, Currency, i64); 6] {
    [
        (Currency::usd(), Currency::gbp(), 75),
        (Currency::usd(), Currency::eur(), 85),
        (Currency::gbp(), Currency::usd(), 133),
        (Currency::gbp(), Currency::eur(), 114),
        (Currency::eur(), Currency::usd(), 118),
        (Currency::eur(), Currency::gbp(), 88),
    ]
}

/// In-memory table of directed conversion rates.
///
/// The table is not required to be symmetric: GBP->USD and USD->GBP are
/// looked up independently.
#[derive(Debug, Clone, Default)]
pub struct StaticRateTable {
    rates: HashMap<(Currency, Currency), Decimal>,
}

impl StaticRateTable {
    /// Create an empty table (identity conversions only)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with the default GBP/USD/EUR rates
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        for (from, to, scaled) in default_rates() {
            table.set_rate(from, to, Decimal::new(scaled, 2));
        }
        table
    }

    /// Set (or replace) the rate for one direction
    pub fn set_rate(&mut self, from: Currency, to: Currency, rate: Decimal) {
        self.rates.insert((from, to), rate);
    }

    /// Rate for `from -> to`; identical currencies always convert at 1
    pub fn rate(&self, from: &Currency, to: &Currency) -> Option<Decimal> {
        if from == to {
            return Some(Decimal::ONE);
        }
        self.rates.get(&(from.clone(), to.clone())).copied()
    }

    /// Convert and round to money precision
    pub fn convert_amount(
        &self,
        from: &Currency,
        to: &Currency,
        amount: Decimal,
    ) -> Result<(Decimal, Decimal), OracleError> {
        let rate = self
            .rate(from, to)
            .ok_or_else(|| OracleError::UnsupportedPair {
                from: from.clone(),
                to: to.clone(),
            })?;
        let converted = amount
            .checked_mul(rate)
            .ok_or(OracleError::OutOfRange(amount))?;
        Ok((round_money(converted), rate))
    }
}

#[async_trait]
impl RateOracle for StaticRateTable {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn convert(
        &self,
        from: &Currency,
        to: &Currency,
        amount: Decimal,
    ) -> Result<Decimal, OracleError> {
        self.convert_amount(from, to, amount)
            .map(|(converted, _)| converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_rates() {
        let table = StaticRateTable::with_defaults();
        assert_eq!(table.rate(&Currency::gbp(), &Currency::usd()), Some(dec!(1.33)));
        assert_eq!(table.rate(&Currency::usd(), &Currency::gbp()), Some(dec!(0.75)));
        assert_eq!(table.rate(&Currency::eur(), &Currency::gbp()), Some(dec!(0.88)));
    }

    #[test]
    fn test_identity_rate() {
        let table = StaticRateTable::new();
        assert_eq!(table.rate(&Currency::eur(), &Currency::eur()), Some(Decimal::ONE));
    }

    #[test]
    fn test_convert_amount_rounds() {
        let table = StaticRateTable::with_defaults();
        let (converted, rate) = table
            .convert_amount(&Currency::usd(), &Currency::eur(), dec!(10.01))
            .unwrap();
        // 10.01 * 0.85 = 8.5085
        assert_eq!(converted, dec!(8.51));
        assert_eq!(rate, dec!(0.85));
    }

    #[test]
    fn test_convert_amount_overflow() {
        let table = StaticRateTable::with_defaults();

        let result = table.convert_amount(&Currency::gbp(), &Currency::usd(), Decimal::MAX);

        assert!(matches!(result, Err(OracleError::OutOfRange(_))));
    }

    #[tokio::test]
    async fn test_unsupported_pair() {
        let table = StaticRateTable::with_defaults();
        let jpy = Currency::new("JPY").unwrap();

        let result = table.convert(&Currency::gbp(), &jpy, dec!(10)).await;

        assert!(matches!(result, Err(OracleError::UnsupportedPair { .. })));
    }

    #[tokio::test]
    async fn test_convert_gbp_to_usd() {
        let table = StaticRateTable::with_defaults();
        let converted = table
            .convert(&Currency::gbp(), &Currency::usd(), dec!(10))
            .await
            .unwrap();
        assert_eq!(converted, dec!(13.30));
    }
}
