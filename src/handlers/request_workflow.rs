//! Request Workflow
//!
//! Payment requests: one user asks another for funds, and the requestee later
//! accepts (which runs a transfer) or rejects. A request leaves `Pending`
//! exactly once.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::{DomainError, PaymentRequest, RequestStatus};
use crate::error::AppResult;
use crate::ledger::{LedgerStore, LedgerTx};

use super::{AcceptedRequest, CreateRequestCommand, TransferCommand, TransferEngine};

pub struct RequestWorkflow<S: LedgerStore> {
    store: Arc<S>,
    engine: Arc<TransferEngine<S>>,
}

impl<S: LedgerStore> RequestWorkflow<S> {
    pub fn new(engine: Arc<TransferEngine<S>>) -> Self {
        Self {
            store: engine.store().clone(),
            engine,
        }
    }

    /// Record a new pending request. Both parties must hold accounts.
    pub async fn create_request(&self, command: CreateRequestCommand) -> AppResult<PaymentRequest> {
        if command.requester_id == command.requestee_id {
            return Err(DomainError::SameAccountTransfer.into());
        }

        for owner_id in [command.requester_id, command.requestee_id] {
            if self.store.find_account(owner_id).await?.is_none() {
                return Err(DomainError::AccountNotFound(owner_id).into());
            }
        }

        let request = PaymentRequest::new(
            command.requester_id,
            command.requestee_id,
            command.amount,
            command.currency,
            self.engine.clock().now(),
        );

        let mut tx = self.store.begin().await?;
        tx.insert_request(&request).await?;
        tx.commit().await?;

        info!(
            request_id = %request.id,
            requester_id = %request.requester_id,
            requestee_id = %request.requestee_id,
            amount = %request.amount,
            currency = %request.currency,
            "Payment request created"
        );

        Ok(request)
    }

    /// Settle a pending request: the requestee pays the requester.
    ///
    /// The status change commits in the same transaction as the transfer, so
    /// a failed transfer (e.g. insufficient funds) leaves the request pending.
    pub async fn accept(&self, request_id: Uuid, acting_user: Uuid) -> AppResult<AcceptedRequest> {
        let mut request = self.load(request_id).await?;
        request.authorize(acting_user)?;
        request.ensure_pending()?;

        let receipt = self
            .engine
            .transfer(TransferCommand::from_request(&request))
            .await?;
        request.transition(RequestStatus::Accepted)?;

        info!(
            request_id = %request.id,
            payment_id = %receipt.payment.id,
            "Payment request accepted"
        );

        Ok(AcceptedRequest { request, receipt })
    }

    /// Decline a pending request. No balances change.
    pub async fn reject(&self, request_id: Uuid, acting_user: Uuid) -> AppResult<PaymentRequest> {
        let mut tx = self.store.begin().await?;

        let mut request = tx
            .lock_request(request_id)
            .await?
            .ok_or(DomainError::RequestNotFound(request_id))?;
        request.authorize(acting_user)?;
        request.transition(RequestStatus::Rejected)?;

        tx.update_request_status(&request).await?;
        tx.commit().await?;

        info!(request_id = %request.id, "Payment request rejected");

        Ok(request)
    }

    pub async fn get_request(&self, request_id: Uuid) -> AppResult<PaymentRequest> {
        self.load(request_id).await
    }

    async fn load(&self, request_id: Uuid) -> AppResult<PaymentRequest> {
        Ok(self
            .store
            .find_request(request_id)
            .await?
            .ok_or(DomainError::RequestNotFound(request_id))?)
    }
}
