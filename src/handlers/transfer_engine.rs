//! Transfer Engine
//!
//! Computes both legs of a transfer in each party's native currency, then
//! debits the sender, credits the recipient and records the payment inside a
//! single ledger transaction.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ConversionPolicy;
use crate::domain::{
    Account, Amount, Clock, Currency, DomainError, Payment, RequestStatus,
};
use crate::error::{AppError, AppResult};
use crate::ledger::{AccountLedger, LedgerStore, LedgerTx, StoreError};
use crate::oracle::RateOracle;

use super::{ConversionQuote, LegConversion, TransferCommand, TransferLeg, TransferReceipt};

/// Attempts for one transfer when the store reports a serialization conflict
const MAX_RETRIES: u32 = 3;

/// Orchestrates currency normalization and the atomic two-account mutation
pub struct TransferEngine<S: LedgerStore> {
    store: Arc<S>,
    oracle: Arc<dyn RateOracle>,
    clock: Arc<dyn Clock>,
    policy: ConversionPolicy,
}

impl<S: LedgerStore> TransferEngine<S> {
    pub fn new(store: Arc<S>, oracle: Arc<dyn RateOracle>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            oracle,
            clock,
            policy: ConversionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ConversionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn policy(&self) -> ConversionPolicy {
        self.policy
    }

    /// Execute a transfer.
    ///
    /// Oracle failures never fail the transfer: the affected leg falls back to
    /// the raw requested amount and is flagged in the receipt.
    pub async fn transfer(&self, command: TransferCommand) -> AppResult<TransferReceipt> {
        if command.sender_id == command.recipient_id {
            return Err(DomainError::SameAccountTransfer.into());
        }

        let sender = self
            .store
            .find_account(command.sender_id)
            .await?
            .ok_or(DomainError::AccountNotFound(command.sender_id))?;
        let recipient = self
            .store
            .find_account(command.recipient_id)
            .await?
            .ok_or(DomainError::AccountNotFound(command.recipient_id))?;

        // Oracle calls happen before the transaction opens so no lock is held
        // across a network round-trip.
        let quote = self
            .quote(&sender, &recipient, &command.amount, &command.currency)
            .await?;

        for attempt in 0..MAX_RETRIES {
            match self.try_commit(&command, &quote).await {
                Ok(receipt) => {
                    info!(
                        payment_id = %receipt.payment.id,
                        sender_id = %command.sender_id,
                        recipient_id = %command.recipient_id,
                        debited = %receipt.debited.amount,
                        debited_currency = %receipt.debited.currency,
                        credited = %receipt.credited.amount,
                        credited_currency = %receipt.credited.currency,
                        origin = %command.origin(),
                        conversion_applied = receipt.conversion_applied(),
                        "Transfer completed"
                    );
                    return Ok(receipt);
                }
                Err(AppError::Store(e)) if e.is_retryable() => {
                    if attempt + 1 == MAX_RETRIES {
                        warn!(
                            error = %e,
                            sender_id = %command.sender_id,
                            recipient_id = %command.recipient_id,
                            "Ledger conflict persisted, giving up after {} attempts",
                            MAX_RETRIES
                        );
                        break;
                    }
                    let delay = Duration::from_millis(50 * (attempt as u64 + 1));
                    warn!(
                        error = %e,
                        "Ledger conflict, retrying transfer (attempt {}/{})",
                        attempt + 1,
                        MAX_RETRIES
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(StoreError::MaxRetriesExceeded.into())
    }

    /// Compute both legs without touching the ledger.
    ///
    /// Under `IndependentLegs` each leg is converted from the requested
    /// currency with its own oracle lookup, so with three distinct currencies
    /// the value credited need not match the value debited. `SenderAnchored`
    /// derives the credit leg from the debited amount instead.
    pub async fn quote(
        &self,
        sender: &Account,
        recipient: &Account,
        amount: &Amount,
        currency: &Currency,
    ) -> AppResult<ConversionQuote> {
        let debit = self.convert_leg(amount, currency, &sender.currency).await?;

        let credit = match self.policy {
            // A fallback debit leg is not really in the sender's currency, so
            // anchoring on it would convert the wrong units.
            ConversionPolicy::SenderAnchored if !debit.is_fallback() => {
                self.convert_leg(&debit.amount, &sender.currency, &recipient.currency)
                    .await?
            }
            _ => self.convert_leg(amount, currency, &recipient.currency).await?,
        };

        Ok(ConversionQuote { debit, credit })
    }

    /// Express `amount` of `from` in `to`, falling back to the raw amount when
    /// the oracle cannot answer.
    pub async fn convert_leg(
        &self,
        amount: &Amount,
        from: &Currency,
        to: &Currency,
    ) -> AppResult<TransferLeg> {
        if from == to {
            return Ok(TransferLeg {
                amount: *amount,
                currency: to.clone(),
                conversion: LegConversion::NotRequired,
            });
        }

        match self.oracle.convert(from, to, amount.value()).await {
            Ok(converted) => {
                let converted = Amount::quantize(converted).map_err(|e| {
                    DomainError::InvalidAmount(format!(
                        "{} {} converts to an unusable {} amount: {}",
                        amount, from, to, e
                    ))
                })?;
                Ok(TransferLeg {
                    amount: converted,
                    currency: to.clone(),
                    conversion: LegConversion::Converted,
                })
            }
            Err(e) => {
                warn!(
                    oracle = self.oracle.name(),
                    from = %from,
                    to = %to,
                    amount = %amount,
                    error = %e,
                    "Rate oracle unavailable, using unconverted amount"
                );
                Ok(TransferLeg {
                    amount: *amount,
                    currency: to.clone(),
                    conversion: LegConversion::Unavailable,
                })
            }
        }
    }

    /// One attempt at the atomic part. Any error drops the transaction,
    /// which rolls back everything written so far.
    async fn try_commit(
        &self,
        command: &TransferCommand,
        quote: &ConversionQuote,
    ) -> AppResult<TransferReceipt> {
        let mut tx = self.store.begin().await?;

        let mut request = match command.request_id {
            Some(request_id) => {
                let request = tx
                    .lock_request(request_id)
                    .await?
                    .ok_or(DomainError::RequestNotFound(request_id))?;
                request.ensure_pending()?;
                Some(request)
            }
            None => None,
        };

        {
            let mut ledger = AccountLedger::new(&mut tx);
            let (mut sender, mut recipient) = ledger
                .lock_pair(command.sender_id, command.recipient_id)
                .await?;

            if sender.currency != quote.debit.currency || recipient.currency != quote.credit.currency
            {
                return Err(AppError::Internal(format!(
                    "account currency changed during transfer {} -> {}",
                    command.sender_id, command.recipient_id
                )));
            }

            ledger.debit(&mut sender, &quote.debit.amount).await?;
            ledger.credit(&mut recipient, &quote.credit.amount).await?;
        }

        let payment = Payment {
            id: Uuid::new_v4(),
            sender_id: command.sender_id,
            recipient_id: command.recipient_id,
            amount: quote.credit.amount,
            currency: quote.credit.currency.clone(),
            original_amount: Some(command.amount),
            original_currency: command.currency.clone(),
            timestamp: self.clock.now(),
            origin: command.origin(),
            request_id: command.request_id,
            read_status: false,
        };
        tx.insert_payment(&payment).await?;

        if let Some(request) = request.as_mut() {
            request.transition(RequestStatus::Accepted)?;
            tx.update_request_status(request).await?;
        }

        tx.commit().await?;

        Ok(TransferReceipt {
            payment,
            debited: quote.debit.clone(),
            credited: quote.credit.clone(),
        })
    }
}
