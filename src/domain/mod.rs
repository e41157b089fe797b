//! Domain module
//!
//! Core domain types and business rules.

pub mod amount;
pub mod clock;
pub mod context;
pub mod currency;
pub mod error;
pub mod models;

pub use amount::{round_money, Amount, AmountError, Balance, MONEY_SCALE};
pub use clock::{Clock, FixedClock, SystemClock};
pub use context::OperationContext;
pub use currency::{Currency, CurrencyError, SUPPORTED_CURRENCIES};
pub use error::DomainError;
pub use models::{Account, Payment, PaymentOrigin, PaymentRequest, RequestStatus};
