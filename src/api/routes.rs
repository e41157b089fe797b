//! API Routes
//!
//! HTTP endpoint definitions.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    Account, Amount, Balance, Currency, DomainError, OperationContext, PaymentOrigin,
    PaymentRequest, RequestStatus,
};
use crate::error::{AppError, AppResult};
use crate::handlers::{
    AccountHandler, CreateRequestCommand, LegConversion, OpenAccountCommand, RequestWorkflow,
    TransferCommand, TransferEngine, TransferReceipt,
};
use crate::ledger::LedgerStore;
use crate::oracle::StaticRateTable;

use super::middleware::acting_user;

// =========================================================================
// Application state
// =========================================================================

/// Shared services behind the routes
pub struct AppState<S: LedgerStore> {
    pub engine: Arc<TransferEngine<S>>,
    pub workflow: Arc<RequestWorkflow<S>>,
    pub accounts: Arc<AccountHandler<S>>,
    /// Served by `/conversion`
    pub rates: Arc<StaticRateTable>,
}

impl<S: LedgerStore> AppState<S> {
    pub fn new(
        engine: Arc<TransferEngine<S>>,
        starting_balance: Amount,
        starting_currency: Currency,
        rates: StaticRateTable,
    ) -> Self {
        Self {
            workflow: Arc::new(RequestWorkflow::new(engine.clone())),
            accounts: Arc::new(AccountHandler::new(
                engine.clone(),
                starting_balance,
                starting_currency,
            )),
            engine,
            rates: Arc::new(rates),
        }
    }
}

// Derive would require `S: Clone`
impl<S: LedgerStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            workflow: self.workflow.clone(),
            accounts: self.accounts.clone(),
            rates: self.rates.clone(),
        }
    }
}

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct OpenAccountRequest {
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub owner_id: Uuid,
    pub currency: Currency,
    pub balance: Balance,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            owner_id: account.owner_id,
            currency: account.currency,
            balance: account.balance,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OpenAccountResponse {
    #[serde(flatten)]
    pub account: AccountResponse,
    pub conversion: LegConversion,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentBody {
    pub recipient_id: Uuid,
    pub amount: String,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub payment_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub debited_amount: Amount,
    pub debited_currency: Currency,
    pub credited_amount: Amount,
    pub credited_currency: Currency,
    pub original_amount: Option<Amount>,
    pub original_currency: Currency,
    pub origin: PaymentOrigin,
    pub request_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub conversion_applied: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub message: String,
}

impl From<TransferReceipt> for PaymentResponse {
    fn from(receipt: TransferReceipt) -> Self {
        let conversion_applied = receipt.conversion_applied();
        let warnings = receipt.warnings();
        let message = receipt.summary();
        let TransferReceipt {
            payment,
            debited,
            credited,
        } = receipt;

        Self {
            payment_id: payment.id,
            sender_id: payment.sender_id,
            recipient_id: payment.recipient_id,
            debited_amount: debited.amount,
            debited_currency: debited.currency,
            credited_amount: credited.amount,
            credited_currency: credited.currency,
            original_amount: payment.original_amount,
            original_currency: payment.original_currency,
            origin: payment.origin,
            request_id: payment.request_id,
            timestamp: payment.timestamp,
            conversion_applied,
            warnings,
            message,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub requestee_id: Uuid,
    pub amount: String,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentRequestResponse {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub requestee_id: Uuid,
    pub amount: Amount,
    pub currency: Currency,
    pub status: RequestStatus,
    pub timestamp: DateTime<Utc>,
}

impl From<PaymentRequest> for PaymentRequestResponse {
    fn from(request: PaymentRequest) -> Self {
        Self {
            id: request.id,
            requester_id: request.requester_id,
            requestee_id: request.requestee_id,
            amount: request.amount,
            currency: request.currency,
            status: request.status,
            timestamp: request.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AcceptRequestResponse {
    pub request: PaymentRequestResponse,
    pub payment: PaymentResponse,
}

/// Wire contract of the conversion service (numbers, not strings)
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversionResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub converted_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub rate: Decimal,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the `/api/v1` router
pub fn create_router<S: LedgerStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/accounts", post(open_account::<S>))
        .route("/accounts/:owner_id", get(get_account::<S>))
        .route("/payments", post(create_payment::<S>))
        .route("/requests", post(create_request::<S>))
        .route("/requests/:request_id", get(get_request::<S>))
        .route("/requests/:request_id/accept", post(accept_request::<S>))
        .route("/requests/:request_id/reject", post(reject_request::<S>))
}

/// Create the public conversion router
pub fn conversion_router<S: LedgerStore>() -> Router<AppState<S>> {
    Router::new().route("/conversion/:from/:to/:amount", get(convert::<S>))
}

// =========================================================================
// Accounts
// =========================================================================

/// Open the acting user's account
async fn open_account<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<OpenAccountRequest>,
) -> AppResult<(StatusCode, Json<OpenAccountResponse>)> {
    let owner_id = acting_user(&context)?;
    let currency: Currency = request.currency.parse().map_err(DomainError::from)?;

    let result = state
        .accounts
        .open_account(OpenAccountCommand::new(owner_id, currency))
        .await?;

    let warnings = if result.seed.is_fallback() {
        vec![format!(
            "Exchange rate unavailable: starting balance credited as {} {} without conversion",
            result.seed.amount, result.seed.currency
        )]
    } else {
        Vec::new()
    };

    Ok((
        StatusCode::CREATED,
        Json(OpenAccountResponse {
            account: result.account.into(),
            conversion: result.seed.conversion,
            warnings,
        }),
    ))
}

/// Account holders can only read their own account
async fn get_account<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path(owner_id): Path<Uuid>,
) -> AppResult<Json<AccountResponse>> {
    if acting_user(&context)? != owner_id {
        return Err(DomainError::Unauthorized(format!(
            "cannot read the account of user {}",
            owner_id
        ))
        .into());
    }

    let account = state.accounts.get_account(owner_id).await?;
    Ok(Json(account.into()))
}

// =========================================================================
// Payments
// =========================================================================

/// Direct payment from the acting user
async fn create_payment<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Json(body): Json<PaymentBody>,
) -> AppResult<(StatusCode, Json<PaymentResponse>)> {
    let sender_id = acting_user(&context)?;
    let command = TransferCommand::parse(sender_id, body.recipient_id, &body.amount, &body.currency)?;

    let receipt = state.engine.transfer(command).await?;

    Ok((StatusCode::CREATED, Json(receipt.into())))
}

// =========================================================================
// Payment requests
// =========================================================================

/// Ask another user for funds
async fn create_request<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Json(body): Json<CreateRequestBody>,
) -> AppResult<(StatusCode, Json<PaymentRequestResponse>)> {
    let requester_id = acting_user(&context)?;
    let command =
        CreateRequestCommand::parse(requester_id, body.requestee_id, &body.amount, &body.currency)?;

    let request = state.workflow.create_request(command).await?;

    Ok((StatusCode::CREATED, Json(request.into())))
}

/// Visible to both parties of the request
async fn get_request<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<PaymentRequestResponse>> {
    let user_id = acting_user(&context)?;
    let request = state.workflow.get_request(request_id).await?;

    if user_id != request.requester_id && user_id != request.requestee_id {
        return Err(DomainError::Unauthorized(format!(
            "user {} is not a party to payment request {}",
            user_id, request_id
        ))
        .into());
    }

    Ok(Json(request.into()))
}

async fn accept_request<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<AcceptRequestResponse>> {
    let user_id = acting_user(&context)?;
    let accepted = state.workflow.accept(request_id, user_id).await?;

    Ok(Json(AcceptRequestResponse {
        request: accepted.request.into(),
        payment: accepted.receipt.into(),
    }))
}

async fn reject_request<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Extension(context): Extension<OperationContext>,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<PaymentRequestResponse>> {
    let user_id = acting_user(&context)?;
    let request = state.workflow.reject(request_id, user_id).await?;

    Ok(Json(request.into()))
}

// =========================================================================
// GET /conversion/:from/:to/:amount
// =========================================================================

/// Convert with the static rate table
async fn convert<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path((from, to, amount)): Path<(String, String, String)>,
) -> AppResult<Json<ConversionResponse>> {
    let from: Currency = from.parse().map_err(DomainError::from)?;
    let to: Currency = to.parse().map_err(DomainError::from)?;
    let amount: Decimal = amount
        .trim()
        .parse()
        .map_err(|_| AppError::InvalidRequest(format!("Invalid amount: {}", amount)))?;
    if amount.is_sign_negative() {
        return Err(AppError::InvalidRequest(format!(
            "Amount must not be negative: {}",
            amount
        )));
    }

    let (converted_amount, rate) = state
        .rates
        .convert_amount(&from, &to, amount)
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?;

    Ok(Json(ConversionResponse {
        converted_amount,
        rate,
    }))
}
