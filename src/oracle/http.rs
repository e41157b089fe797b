//! HTTP rate oracle
//!
//! Calls a remote conversion service:
//! `GET {base_url}/conversion/{from}/{to}/{amount}` answering
//! `{"converted_amount": <number>}` with status 200. Any other status, a
//! timeout or a transport error means the oracle is unavailable.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use super::{OracleError, RateOracle};
use crate::domain::Currency;

#[derive(Debug, Deserialize)]
struct ConversionResponse {
    converted_amount: serde_json::Number,
}

/// Remote conversion service client
#[derive(Debug, Clone)]
pub struct HttpRateOracle {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRateOracle {
    /// Create a client; `timeout` bounds the whole request
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, from: &Currency, to: &Currency, amount: Decimal) -> String {
        format!(
            "{}/conversion/{}/{}/{}",
            self.base_url,
            from,
            to,
            amount.normalize()
        )
    }
}

/// Parse a JSON number without going through f64 when possible
fn parse_number(number: &serde_json::Number) -> Result<Decimal, OracleError> {
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| OracleError::InvalidResponse(format!("converted_amount {}: {}", text, e)))
}

#[async_trait]
impl RateOracle for HttpRateOracle {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn convert(
        &self,
        from: &Currency,
        to: &Currency,
        amount: Decimal,
    ) -> Result<Decimal, OracleError> {
        let url = self.url(from, to, amount);
        debug!(url = %url, "Requesting conversion");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::Unavailable(format!(
                "conversion service returned {}",
                status
            )));
        }

        let body: ConversionResponse = response.json().await?;
        let converted = parse_number(&body.converted_amount)?;
        if converted.is_sign_negative() {
            return Err(OracleError::InvalidResponse(format!(
                "negative converted_amount {}",
                converted
            )));
        }
        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_url_layout() {
        let oracle =
            HttpRateOracle::new("http://rates.local/payapp/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            oracle.url(&Currency::gbp(), &Currency::usd(), dec!(10.50)),
            "http://rates.local/payapp/conversion/GBP/USD/10.5"
        );
    }

    #[test]
    fn test_parse_number() {
        let number: serde_json::Number = serde_json::from_str("13.3").unwrap();
        assert_eq!(parse_number(&number).unwrap(), dec!(13.3));

        let number: serde_json::Number = serde_json::from_str("1e2").unwrap();
        assert_eq!(parse_number(&number).unwrap(), dec!(100));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        // Port 9 (discard) on loopback is not expected to accept HTTP
        let oracle = HttpRateOracle::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();

        let result = oracle
            .convert(&Currency::gbp(), &Currency::usd(), dec!(10))
            .await;

        assert!(matches!(result, Err(OracleError::Unavailable(_))));
    }
}
