//! Command definitions
//!
//! Commands represent intentions to change the ledger; results describe
//! what actually happened.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    Account, Amount, Currency, DomainError, Payment, PaymentOrigin, PaymentRequest,
};

// =========================================================================
// TransferCommand
// =========================================================================

/// Command to move funds from one account to another
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCommand {
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    /// Amount as specified by the payer
    pub amount: Amount,
    /// Currency the payer specified the amount in
    pub currency: Currency,
    /// Set when the transfer settles a payment request
    pub request_id: Option<Uuid>,
}

impl TransferCommand {
    /// A direct payment from `sender_id` to `recipient_id`
    pub fn direct(sender_id: Uuid, recipient_id: Uuid, amount: Amount, currency: Currency) -> Self {
        Self {
            sender_id,
            recipient_id,
            amount,
            currency,
            request_id: None,
        }
    }

    /// Parse raw user input into a direct payment
    pub fn parse(
        sender_id: Uuid,
        recipient_id: Uuid,
        amount: &str,
        currency: &str,
    ) -> Result<Self, DomainError> {
        Ok(Self::direct(
            sender_id,
            recipient_id,
            amount.parse()?,
            currency.parse()?,
        ))
    }

    /// The transfer that settles `request`: the requestee pays the requester
    pub fn from_request(request: &PaymentRequest) -> Self {
        Self {
            sender_id: request.requestee_id,
            recipient_id: request.requester_id,
            amount: request.amount,
            currency: request.currency.clone(),
            request_id: Some(request.id),
        }
    }

    pub fn origin(&self) -> PaymentOrigin {
        if self.request_id.is_some() {
            PaymentOrigin::FromRequest
        } else {
            PaymentOrigin::DirectPayment
        }
    }
}

// =========================================================================
// CreateRequestCommand
// =========================================================================

/// Command to ask another account holder for funds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequestCommand {
    pub requester_id: Uuid,
    pub requestee_id: Uuid,
    pub amount: Amount,
    pub currency: Currency,
}

impl CreateRequestCommand {
    pub fn parse(
        requester_id: Uuid,
        requestee_id: Uuid,
        amount: &str,
        currency: &str,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            requester_id,
            requestee_id,
            amount: amount.parse()?,
            currency: currency.parse()?,
        })
    }
}

// =========================================================================
// OpenAccountCommand
// =========================================================================

/// Command to open the ledger account of a newly registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAccountCommand {
    pub owner_id: Uuid,
    pub currency: Currency,
}

impl OpenAccountCommand {
    pub fn new(owner_id: Uuid, currency: Currency) -> Self {
        Self { owner_id, currency }
    }
}

// =========================================================================
// Results
// =========================================================================

/// Whether a leg went through the rate oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegConversion {
    /// Account currency equals the requested currency
    NotRequired,
    /// Oracle conversion applied
    Converted,
    /// Oracle unavailable; the raw amount was used as-is
    Unavailable,
}

/// One side of a transfer, in that party's native currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferLeg {
    pub amount: Amount,
    pub currency: Currency,
    pub conversion: LegConversion,
}

impl TransferLeg {
    pub fn is_fallback(&self) -> bool {
        self.conversion == LegConversion::Unavailable
    }
}

/// Both legs of a transfer, computed before any mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionQuote {
    pub debit: TransferLeg,
    pub credit: TransferLeg,
}

/// Result of a successful transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub payment: Payment,
    /// Taken from the sender, in the sender's currency
    pub debited: TransferLeg,
    /// Given to the recipient, in the recipient's currency
    pub credited: TransferLeg,
}

impl TransferReceipt {
    /// False if either leg fell back to the unconverted amount
    pub fn conversion_applied(&self) -> bool {
        !self.debited.is_fallback() && !self.credited.is_fallback()
    }

    /// User-facing warnings about unconverted legs
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.debited.is_fallback() {
            warnings.push(format!(
                "Exchange rate unavailable: {} was deducted as {} without conversion",
                self.debited.amount, self.debited.currency
            ));
        }
        if self.credited.is_fallback() {
            warnings.push(format!(
                "Exchange rate unavailable: {} was credited as {} without conversion",
                self.credited.amount, self.credited.currency
            ));
        }
        warnings
    }

    pub fn summary(&self) -> String {
        let original = self
            .payment
            .original_amount
            .map(|a| a.to_string())
            .unwrap_or_else(|| self.credited.amount.to_string());
        format!(
            "Payment of {} {} sent successfully. Deducted {} {}, credited {} {}.",
            original,
            self.payment.original_currency,
            self.debited.amount,
            self.debited.currency,
            self.credited.amount,
            self.credited.currency
        )
    }
}

/// Result of accepting a payment request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedRequest {
    pub request: PaymentRequest,
    pub receipt: TransferReceipt,
}

/// Result of opening an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAccountResult {
    pub account: Account,
    /// How the starting balance was derived
    pub seed: TransferLeg,
}
