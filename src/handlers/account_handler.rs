//! Account Handler
//!
//! Opens ledger accounts for newly registered users, seeded with the starting
//! balance converted into the account currency.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::{Account, Amount, Balance, Currency, DomainError};
use crate::error::AppResult;
use crate::ledger::{LedgerStore, LedgerTx};

use super::{OpenAccountCommand, OpenAccountResult, TransferEngine};

pub struct AccountHandler<S: LedgerStore> {
    store: Arc<S>,
    engine: Arc<TransferEngine<S>>,
    starting_balance: Amount,
    starting_currency: Currency,
}

impl<S: LedgerStore> AccountHandler<S> {
    pub fn new(
        engine: Arc<TransferEngine<S>>,
        starting_balance: Amount,
        starting_currency: Currency,
    ) -> Self {
        Self {
            store: engine.store().clone(),
            engine,
            starting_balance,
            starting_currency,
        }
    }

    pub async fn open_account(&self, command: OpenAccountCommand) -> AppResult<OpenAccountResult> {
        if !command.currency.is_supported() {
            return Err(DomainError::InvalidCurrency(format!(
                "{} accounts are not supported",
                command.currency
            ))
            .into());
        }

        if self.store.find_account(command.owner_id).await?.is_some() {
            return Err(DomainError::AccountExists(command.owner_id).into());
        }

        // Same fallback as a transfer leg: raw baseline when the oracle is down
        let seed = self
            .engine
            .convert_leg(&self.starting_balance, &self.starting_currency, &command.currency)
            .await?;

        let account = Account::new(
            command.owner_id,
            command.currency,
            Balance::new(seed.amount.value()).map_err(DomainError::from)?,
        );

        let mut tx = self.store.begin().await?;
        if !tx.insert_account(&account).await? {
            return Err(DomainError::AccountExists(account.owner_id).into());
        }
        tx.commit().await?;

        info!(
            owner_id = %account.owner_id,
            currency = %account.currency,
            balance = %account.balance,
            conversion = ?seed.conversion,
            "Account opened"
        );

        Ok(OpenAccountResult { account, seed })
    }

    pub async fn get_account(&self, owner_id: Uuid) -> AppResult<Account> {
        Ok(self
            .store
            .find_account(owner_id)
            .await?
            .ok_or(DomainError::AccountNotFound(owner_id))?)
    }
}
