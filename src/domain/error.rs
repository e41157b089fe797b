//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use super::{AmountError, Currency, CurrencyError, RequestStatus};

/// Business rule violations surfaced to the caller.
///
/// None of these leave a partial mutation behind: they are raised either
/// before the ledger transaction starts or inside it, in which case the
/// transaction is rolled back.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Sender balance does not cover the debit
    #[error("Insufficient funds: required {required} {currency}, available {available} {currency}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
        currency: Currency,
    },

    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    #[error("Account already exists for owner {0}")]
    AccountExists(Uuid),

    #[error("Payment request not found: {0}")]
    RequestNotFound(Uuid),

    /// Acting user is not allowed to resolve the request
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Request has already been accepted or rejected
    #[error("Payment request {request_id} is already {status}")]
    InvalidState {
        request_id: Uuid,
        status: RequestStatus,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    #[error("Cannot transfer to the same account")]
    SameAccountTransfer,
}

impl DomainError {
    pub fn insufficient_funds(required: Decimal, available: Decimal, currency: Currency) -> Self {
        Self::InsufficientFunds {
            required,
            available,
            currency,
        }
    }

    /// Check if this is a client error (user's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFunds { .. }
                | Self::InvalidAmount(_)
                | Self::InvalidCurrency(_)
                | Self::SameAccountTransfer
                | Self::Unauthorized(_)
        )
    }
}

impl From<AmountError> for DomainError {
    fn from(err: AmountError) -> Self {
        Self::InvalidAmount(err.to_string())
    }
}

impl From<CurrencyError> for DomainError {
    fn from(err: CurrencyError) -> Self {
        Self::InvalidCurrency(err.0)
    }
}
