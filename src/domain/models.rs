//! Ledger entities
//!
//! Accounts, payment records and payment requests as persisted by the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{Amount, Balance, Currency, DomainError};

// =========================================================================
// Account
// =========================================================================

/// Per-owner balance held in a single native currency.
///
/// Balances only change through [`Account::debit`] and [`Account::credit`],
/// which the ledger calls inside a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub owner_id: Uuid,
    pub currency: Currency,
    pub balance: Balance,
}

impl Account {
    pub fn new(owner_id: Uuid, currency: Currency, balance: Balance) -> Self {
        Self {
            owner_id,
            currency,
            balance,
        }
    }

    /// Remove `amount` (already in this account's currency) from the balance.
    pub fn debit(&mut self, amount: &Amount) -> Result<(), DomainError> {
        if !self.balance.is_sufficient_for(amount) {
            return Err(DomainError::insufficient_funds(
                amount.value(),
                self.balance.value(),
                self.currency.clone(),
            ));
        }
        self.balance = self
            .balance
            .debit(amount)
            .map_err(|e| DomainError::InvalidAmount(e.to_string()))?;
        Ok(())
    }

    /// Add `amount` (already in this account's currency) to the balance.
    pub fn credit(&mut self, amount: &Amount) -> Result<(), DomainError> {
        self.balance = self.balance.credit(amount)?;
        Ok(())
    }
}

// =========================================================================
// Payment
// =========================================================================

/// How a payment came about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentOrigin {
    /// Payer initiated the transfer directly
    #[serde(rename = "direct")]
    DirectPayment,
    /// Transfer executed by accepting a payment request
    #[serde(rename = "request")]
    FromRequest,
}

impl PaymentOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentOrigin::DirectPayment => "direct",
            PaymentOrigin::FromRequest => "request",
        }
    }
}

impl fmt::Display for PaymentOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(PaymentOrigin::DirectPayment),
            "request" => Ok(PaymentOrigin::FromRequest),
            other => Err(format!("unknown payment origin: {}", other)),
        }
    }
}

/// Immutable record of a completed transfer.
///
/// `amount`/`currency` is what the recipient was credited;
/// `original_amount`/`original_currency` is what the payer asked to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub amount: Amount,
    pub currency: Currency,
    pub original_amount: Option<Amount>,
    pub original_currency: Currency,
    pub timestamp: DateTime<Utc>,
    pub origin: PaymentOrigin,
    /// Set when the payment settled a request
    pub request_id: Option<Uuid>,
    /// Owned by the notification side; always created unread
    pub read_status: bool,
}

// =========================================================================
// PaymentRequest
// =========================================================================

/// Lifecycle of a payment request. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "accepted" => Ok(RequestStatus::Accepted),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(format!("unknown request status: {}", other)),
        }
    }
}

/// A deferred transfer: `requester` asks `requestee` to pay `amount` `currency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub requestee_id: Uuid,
    pub amount: Amount,
    pub currency: Currency,
    pub status: RequestStatus,
    pub timestamp: DateTime<Utc>,
    pub read_status: bool,
}

impl PaymentRequest {
    pub fn new(
        requester_id: Uuid,
        requestee_id: Uuid,
        amount: Amount,
        currency: Currency,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            requester_id,
            requestee_id,
            amount,
            currency,
            status: RequestStatus::Pending,
            timestamp,
            read_status: false,
        }
    }

    /// Only the requestee may accept or reject.
    pub fn authorize(&self, acting_user: Uuid) -> Result<(), DomainError> {
        if acting_user != self.requestee_id {
            return Err(DomainError::Unauthorized(format!(
                "user {} is not the requestee of payment request {}",
                acting_user, self.id
            )));
        }
        Ok(())
    }

    pub fn ensure_pending(&self) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidState {
                request_id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }

    /// Move out of `Pending`. Fails if the request was already resolved.
    pub fn transition(&mut self, to: RequestStatus) -> Result<(), DomainError> {
        self.ensure_pending()?;
        if to == RequestStatus::Pending {
            return Err(DomainError::InvalidState {
                request_id: self.id,
                status: self.status,
            });
        }
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> PaymentRequest {
        PaymentRequest::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Amount::new(dec!(20)).unwrap(),
            Currency::eur(),
            Utc::now(),
        )
    }

    #[test]
    fn test_account_debit_and_credit() {
        let mut account = Account::new(Uuid::new_v4(), Currency::gbp(), Balance::new(dec!(100)).unwrap());

        account.debit(&Amount::new(dec!(10)).unwrap()).unwrap();
        account.credit(&Amount::new(dec!(0.5)).unwrap()).unwrap();

        assert_eq!(account.balance.value(), dec!(90.50));
    }

    #[test]
    fn test_account_debit_insufficient_leaves_balance() {
        let mut account = Account::new(Uuid::new_v4(), Currency::gbp(), Balance::new(dec!(5)).unwrap());

        let err = account.debit(&Amount::new(dec!(10)).unwrap()).unwrap_err();

        assert!(matches!(err, DomainError::InsufficientFunds { .. }));
        assert_eq!(account.balance.value(), dec!(5));
    }

    #[test]
    fn test_request_starts_pending_and_unread() {
        let request = request();
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(!request.read_status);
    }

    #[test]
    fn test_request_transitions_once() {
        let mut request = request();

        request.transition(RequestStatus::Rejected).unwrap();
        let err = request.transition(RequestStatus::Accepted).unwrap_err();

        assert!(matches!(
            err,
            DomainError::InvalidState {
                status: RequestStatus::Rejected,
                ..
            }
        ));
        assert_eq!(request.status, RequestStatus::Rejected);
    }

    #[test]
    fn test_request_cannot_transition_to_pending() {
        let mut request = request();
        assert!(request.transition(RequestStatus::Pending).is_err());
        assert_eq!(request.status, RequestStatus::Pending);
    }

    #[test]
    fn test_request_authorize_only_requestee() {
        let request = request();
        assert!(request.authorize(request.requestee_id).is_ok());
        assert!(matches!(
            request.authorize(request.requester_id),
            Err(DomainError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_origin_and_status_strings() {
        assert_eq!(PaymentOrigin::FromRequest.as_str(), "request");
        assert_eq!("direct".parse::<PaymentOrigin>().unwrap(), PaymentOrigin::DirectPayment);
        assert_eq!("accepted".parse::<RequestStatus>().unwrap(), RequestStatus::Accepted);
        assert_eq!(
            serde_json::to_string(&PaymentOrigin::DirectPayment).unwrap(),
            r#""direct""#
        );
    }
}
