//! Account Ledger
//!
//! Persistent home of accounts, payment records and payment requests.
//!
//! All mutations happen inside a [`LedgerTx`]: a transaction scope that is
//! either committed as a whole or, when dropped without `commit`, rolled back.
//! Balances are only ever changed through [`AccountLedger::debit`] and
//! [`AccountLedger::credit`] on accounts locked in the same transaction.

mod error;
pub mod memory;
pub mod postgres;

pub use error::StoreError;
pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Account, Amount, DomainError, Payment, PaymentRequest};
use crate::error::AppError;

/// Transactional record store backing the ledger
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    type Tx: LedgerTx;

    /// Open a serializable transaction scope
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Read an account outside any transaction (no lock taken)
    async fn find_account(&self, owner_id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn find_request(&self, request_id: Uuid) -> Result<Option<PaymentRequest>, StoreError>;

    async fn find_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, StoreError>;
}

/// One open ledger transaction.
///
/// Dropping the value without calling [`LedgerTx::commit`] discards every
/// change made through it.
#[async_trait]
pub trait LedgerTx: Send {
    /// Load an account and hold it for the rest of the transaction
    async fn lock_account(&mut self, owner_id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Insert a new account; returns `false` if the owner already has one
    async fn insert_account(&mut self, account: &Account) -> Result<bool, StoreError>;

    /// Persist the balance of a locked account
    async fn update_balance(&mut self, account: &Account) -> Result<(), StoreError>;

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), StoreError>;

    async fn insert_request(&mut self, request: &PaymentRequest) -> Result<(), StoreError>;

    /// Load a payment request and hold it for the rest of the transaction
    async fn lock_request(
        &mut self,
        request_id: Uuid,
    ) -> Result<Option<PaymentRequest>, StoreError>;

    /// Persist the status of a locked request
    async fn update_request_status(&mut self, request: &PaymentRequest) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;
}

/// Debit/credit operations over one open transaction.
///
/// Amounts must already be in the account's native currency.
pub struct AccountLedger<'a, T: LedgerTx> {
    tx: &'a mut T,
}

impl<'a, T: LedgerTx> AccountLedger<'a, T> {
    pub fn new(tx: &'a mut T) -> Self {
        Self { tx }
    }

    /// Lock both parties of a transfer, always in ascending owner-id order so
    /// that concurrent transfers over the same pair cannot deadlock.
    pub async fn lock_pair(
        &mut self,
        sender_id: Uuid,
        recipient_id: Uuid,
    ) -> Result<(Account, Account), AppError> {
        let (first, second) = if sender_id <= recipient_id {
            (sender_id, recipient_id)
        } else {
            (recipient_id, sender_id)
        };

        let first_account = self
            .tx
            .lock_account(first)
            .await?
            .ok_or(DomainError::AccountNotFound(first))?;
        let second_account = self
            .tx
            .lock_account(second)
            .await?
            .ok_or(DomainError::AccountNotFound(second))?;

        if first == sender_id {
            Ok((first_account, second_account))
        } else {
            Ok((second_account, first_account))
        }
    }

    /// Fails with `InsufficientFunds` when `amount` exceeds the balance;
    /// nothing is written in that case.
    pub async fn debit(&mut self, account: &mut Account, amount: &Amount) -> Result<(), AppError> {
        account.debit(amount)?;
        self.tx.update_balance(account).await?;
        Ok(())
    }

    pub async fn credit(&mut self, account: &mut Account, amount: &Amount) -> Result<(), AppError> {
        account.credit(amount)?;
        self.tx.update_balance(account).await?;
        Ok(())
    }
}
