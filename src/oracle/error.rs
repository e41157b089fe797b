//! Rate oracle errors
//!
//! Every variant means "no conversion available". The transfer engine never
//! propagates these to the caller; it applies the raw-amount fallback instead.

use crate::domain::Currency;

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// Network failure, timeout or non-success status
    #[error("Rate oracle unavailable: {0}")]
    Unavailable(String),

    #[error("No rate for {from} -> {to}")]
    UnsupportedPair { from: Currency, to: Currency },

    #[error("Converting {0} overflows")]
    OutOfRange(rust_decimal::Decimal),

    #[error("Invalid rate oracle response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for OracleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            OracleError::InvalidResponse(err.to_string())
        } else {
            OracleError::Unavailable(err.to_string())
        }
    }
}
