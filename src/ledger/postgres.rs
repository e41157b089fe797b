//! PostgreSQL ledger store
//!
//! Transactions run at SERIALIZABLE isolation and take row locks
//! (`SELECT ... FOR UPDATE`) on every account and request they mutate.
//! Serialization failures surface as [`StoreError::Conflict`] so the caller
//! can retry the whole unit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{LedgerStore, LedgerTx, StoreError};
use crate::domain::{
    Account, Amount, Balance, Currency, Payment, PaymentOrigin, PaymentRequest, RequestStatus,
};

type AccountRow = (Uuid, String, Decimal);

type PaymentRow = (
    Uuid,
    Uuid,
    Uuid,
    Decimal,
    String,
    Option<Decimal>,
    String,
    DateTime<Utc>,
    String,
    Option<Uuid>,
    bool,
);

type RequestRow = (Uuid, Uuid, Uuid, Decimal, String, String, DateTime<Utc>, bool);

const SELECT_ACCOUNT: &str = "SELECT owner_id, currency, balance FROM accounts WHERE owner_id = $1";

const SELECT_REQUEST: &str = r#"
    SELECT id, requester_id, requestee_id, amount, currency, status, timestamp, read_status
    FROM payment_requests
    WHERE id = $1
"#;

/// Ledger store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;
        Ok(PgLedgerTx { tx })
    }

    async fn find_account(&self, owner_id: Uuid) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(SELECT_ACCOUNT)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(account_from_row).transpose()
    }

    async fn find_request(&self, request_id: Uuid) -> Result<Option<PaymentRequest>, StoreError> {
        let row: Option<RequestRow> = sqlx::query_as(SELECT_REQUEST)
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(request_from_row).transpose()
    }

    async fn find_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, StoreError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, sender_id, recipient_id, amount, currency, original_amount,
                   original_currency, timestamp, origin, request_id, read_status
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(payment_from_row).transpose()
    }
}

/// Open PostgreSQL transaction; rolled back by sqlx when dropped uncommitted
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn lock_account(&mut self, owner_id: Uuid) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!("{} FOR UPDATE", SELECT_ACCOUNT))
            .bind(owner_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(account_from_row).transpose()
    }

    async fn insert_account(&mut self, account: &Account) -> Result<bool, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            INSERT INTO accounts (owner_id, currency, balance)
            VALUES ($1, $2, $3)
            ON CONFLICT (owner_id) DO NOTHING
            "#,
        )
        .bind(account.owner_id)
        .bind(account.currency.code())
        .bind(account.balance.value())
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        Ok(rows_affected == 1)
    }

    async fn update_balance(&mut self, account: &Account) -> Result<(), StoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = $2, updated_at = NOW()
            WHERE owner_id = $1
            "#,
        )
        .bind(account.owner_id)
        .bind(account.balance.value())
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(StoreError::Corrupt(format!(
                "account {} vanished",
                account.owner_id
            )));
        }
        Ok(())
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, sender_id, recipient_id, amount, currency, original_amount,
                original_currency, timestamp, origin, request_id, read_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(payment.id)
        .bind(payment.sender_id)
        .bind(payment.recipient_id)
        .bind(payment.amount.value())
        .bind(payment.currency.code())
        .bind(payment.original_amount.map(|a| a.value()))
        .bind(payment.original_currency.code())
        .bind(payment.timestamp)
        .bind(payment.origin.as_str())
        .bind(payment.request_id)
        .bind(payment.read_status)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_request(&mut self, request: &PaymentRequest) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO payment_requests (
                id, requester_id, requestee_id, amount, currency, status, timestamp, read_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(request.id)
        .bind(request.requester_id)
        .bind(request.requestee_id)
        .bind(request.amount.value())
        .bind(request.currency.code())
        .bind(request.status.as_str())
        .bind(request.timestamp)
        .bind(request.read_status)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn lock_request(
        &mut self,
        request_id: Uuid,
    ) -> Result<Option<PaymentRequest>, StoreError> {
        let row: Option<RequestRow> = sqlx::query_as(&format!("{} FOR UPDATE", SELECT_REQUEST))
            .bind(request_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(request_from_row).transpose()
    }

    async fn update_request_status(&mut self, request: &PaymentRequest) -> Result<(), StoreError> {
        // Guarded on 'pending' so a request can leave that state only once
        let rows_affected = sqlx::query(
            r#"
            UPDATE payment_requests
            SET status = $2
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(request.id)
        .bind(request.status.as_str())
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(StoreError::Conflict(format!(
                "payment request {} is no longer pending",
                request.id
            )));
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

// =========================================================================
// Row mapping
// =========================================================================

fn corrupt(what: &str, id: Uuid, err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{} {}: {}", what, id, err))
}

fn account_from_row((owner_id, currency, balance): AccountRow) -> Result<Account, StoreError> {
    Ok(Account {
        owner_id,
        currency: Currency::new(&currency).map_err(|e| corrupt("account", owner_id, e))?,
        balance: Balance::new(balance).map_err(|e| corrupt("account", owner_id, e))?,
    })
}

fn payment_from_row(row: PaymentRow) -> Result<Payment, StoreError> {
    let (
        id,
        sender_id,
        recipient_id,
        amount,
        currency,
        original_amount,
        original_currency,
        timestamp,
        origin,
        request_id,
        read_status,
    ) = row;

    Ok(Payment {
        id,
        sender_id,
        recipient_id,
        amount: Amount::new(amount).map_err(|e| corrupt("payment", id, e))?,
        currency: Currency::new(&currency).map_err(|e| corrupt("payment", id, e))?,
        original_amount: original_amount
            .map(Amount::new)
            .transpose()
            .map_err(|e| corrupt("payment", id, e))?,
        original_currency: Currency::new(&original_currency)
            .map_err(|e| corrupt("payment", id, e))?,
        timestamp,
        origin: origin
            .parse::<PaymentOrigin>()
            .map_err(|e| corrupt("payment", id, e))?,
        request_id,
        read_status,
    })
}

fn request_from_row(row: RequestRow) -> Result<PaymentRequest, StoreError> {
    let (id, requester_id, requestee_id, amount, currency, status, timestamp, read_status) = row;

    Ok(PaymentRequest {
        id,
        requester_id,
        requestee_id,
        amount: Amount::new(amount).map_err(|e| corrupt("payment request", id, e))?,
        currency: Currency::new(&currency).map_err(|e| corrupt("payment request", id, e))?,
        status: status
            .parse::<RequestStatus>()
            .map_err(|e| corrupt("payment request", id, e))?,
        timestamp,
        read_status,
    })
}
