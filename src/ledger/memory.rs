//! In-memory ledger store
//!
//! Transactions are fully serialized: `begin` takes the single store lock and
//! works on a staged copy of the state, which replaces the live state only on
//! `commit`. Dropping the transaction releases the lock and discards the copy.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{LedgerStore, LedgerTx, StoreError};
use crate::domain::{Account, Payment, PaymentRequest};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    accounts: HashMap<Uuid, Account>,
    payments: Vec<Payment>,
    requests: HashMap<Uuid, PaymentRequest>,
}

/// Ledger store kept in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account outside the transfer path
    pub async fn seed_account(&self, account: Account) {
        self.state
            .lock()
            .await
            .accounts
            .insert(account.owner_id, account);
    }

    /// All committed payments, oldest first
    pub async fn payments(&self) -> Vec<Payment> {
        self.state.lock().await.payments.clone()
    }

    /// All committed accounts
    pub async fn accounts(&self) -> Vec<Account> {
        self.state.lock().await.accounts.values().cloned().collect()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Tx = MemoryLedgerTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryLedgerTx { guard, staged })
    }

    async fn find_account(&self, owner_id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.state.lock().await.accounts.get(&owner_id).cloned())
    }

    async fn find_request(&self, request_id: Uuid) -> Result<Option<PaymentRequest>, StoreError> {
        Ok(self.state.lock().await.requests.get(&request_id).cloned())
    }

    async fn find_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .payments
            .iter()
            .find(|p| p.id == payment_id)
            .cloned())
    }
}

/// Open transaction on a [`MemoryLedgerStore`]
pub struct MemoryLedgerTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn lock_account(&mut self, owner_id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.staged.accounts.get(&owner_id).cloned())
    }

    async fn insert_account(&mut self, account: &Account) -> Result<bool, StoreError> {
        if self.staged.accounts.contains_key(&account.owner_id) {
            return Ok(false);
        }
        self.staged
            .accounts
            .insert(account.owner_id, account.clone());
        Ok(true)
    }

    async fn update_balance(&mut self, account: &Account) -> Result<(), StoreError> {
        let stored = self
            .staged
            .accounts
            .get_mut(&account.owner_id)
            .ok_or_else(|| StoreError::Corrupt(format!("account {} vanished", account.owner_id)))?;
        stored.balance = account.balance;
        Ok(())
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), StoreError> {
        self.staged.payments.push(payment.clone());
        Ok(())
    }

    async fn insert_request(&mut self, request: &PaymentRequest) -> Result<(), StoreError> {
        self.staged.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn lock_request(
        &mut self,
        request_id: Uuid,
    ) -> Result<Option<PaymentRequest>, StoreError> {
        Ok(self.staged.requests.get(&request_id).cloned())
    }

    async fn update_request_status(&mut self, request: &PaymentRequest) -> Result<(), StoreError> {
        let stored = self
            .staged
            .requests
            .get_mut(&request.id)
            .ok_or_else(|| StoreError::Corrupt(format!("request {} vanished", request.id)))?;
        stored.status = request.status;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        let MemoryLedgerTx { mut guard, staged } = self;
        *guard = staged;
        Ok(())
    }
}
