//! API Routes
//!
//! HTTP endpoint definitions for the wallet ledger.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::OperationContext;
use crate::error::AppError;
use crate::ledger::{
    DeductOptions, Transaction, TransactionCategory, TransactionResult, TransactionStatus,
};
use crate::wallet::WalletStatus;

use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct TopUpRequest {
    /// Amount in minor units (paise)
    pub amount_minor: i64,
    /// Falls back to the Idempotency-Key header when absent
    #[serde(default)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeductRequest {
    /// Amount in minor units (paise)
    pub amount_minor: i64,
    pub category: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    pub description: String,
    #[serde(default)]
    pub related_entity_type: Option<String>,
    #[serde(default)]
    pub related_entity_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub transaction_id: Uuid,
    pub amount_minor: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub status: TransactionStatus,
    pub is_duplicate: bool,
}

impl From<TransactionResult> for TransactionResponse {
    fn from(result: TransactionResult) -> Self {
        Self {
            transaction_id: result.transaction_id,
            amount_minor: result.amount,
            balance_before: result.balance_before,
            balance_after: result.balance_after,
            status: result.status,
            is_duplicate: result.is_duplicate,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: i64,
    pub currency: String,
    pub status: WalletStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user_id: Uuid,
    /// Balance in minor units
    pub balance: i64,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub transaction_id: Uuid,
    pub tx_type: String,
    pub category: String,
    pub amount_minor: i64,
    /// Amount in major units, for display
    pub amount: String,
    pub balance_before: i64,
    pub balance_after: i64,
    pub status: String,
    pub reference_id: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Transaction> for HistoryEntry {
    fn from(tx: &Transaction) -> Self {
        Self {
            transaction_id: tx.uuid,
            tx_type: tx.tx_type.to_string(),
            category: tx.category.to_string(),
            amount_minor: tx.amount,
            amount: tx.amount_major().to_string(),
            balance_before: tx.balance_before,
            balance_after: tx.balance_after,
            status: tx.status.to_string(),
            reference_id: tx.reference_id.clone(),
            description: tx.description.clone(),
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub user_id: Uuid,
    pub transactions: Vec<HistoryEntry>,
    pub total: i64,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/wallets/:user_id", get(get_wallet))
        .route("/wallets/:user_id/balance", get(get_balance))
        .route("/wallets/:user_id/topup", post(top_up))
        .route("/wallets/:user_id/deduct", post(deduct))
        .route("/wallets/:user_id/transactions", get(get_transaction_history))
}

// =========================================================================
// GET /wallets/:user_id
// =========================================================================

/// Get a user's wallet, creating it on first access
async fn get_wallet(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<WalletResponse>, AppError> {
    let wallet = state.coordinator().get_or_create_wallet(user_id).await?;

    Ok(Json(WalletResponse {
        id: wallet.id,
        user_id: wallet.user_id,
        balance: wallet.balance,
        currency: wallet.currency,
        status: wallet.status,
        created_at: wallet.created_at,
        updated_at: wallet.updated_at,
    }))
}

// =========================================================================
// GET /wallets/:user_id/balance
// =========================================================================

/// Get a user's spendable balance
async fn get_balance(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<BalanceResponse>, AppError> {
    let view = state.coordinator().get_balance(user_id).await?;

    Ok(Json(BalanceResponse {
        user_id,
        balance: view.balance,
        currency: view.currency,
    }))
}

// =========================================================================
// POST /wallets/:user_id/topup
// =========================================================================

/// Credit a wallet
async fn top_up(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(context): Extension<OperationContext>,
    headers: axum::http::HeaderMap,
    Json(request): Json<TopUpRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    // The header wins over the body field
    let header_key = headers
        .get("Idempotency-Key")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let idempotency_key = header_key
        .or(request.idempotency_key)
        .ok_or_else(|| AppError::MissingHeader("Idempotency-Key".to_string()))?;

    let result = state
        .coordinator()
        .top_up(
            user_id,
            request.amount_minor,
            &idempotency_key,
            request.metadata,
            &context,
        )
        .await?;

    let status = if result.is_duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((status, Json(result.into())))
}

// =========================================================================
// POST /wallets/:user_id/deduct
// =========================================================================

/// Debit a wallet
async fn deduct(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(context): Extension<OperationContext>,
    headers: axum::http::HeaderMap,
    Json(request): Json<DeductRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let header_key = headers
        .get("Idempotency-Key")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let category = TransactionCategory::from(request.category);

    let mut options = DeductOptions::new(request.description);
    options.idempotency_key = header_key.or(request.idempotency_key);
    options.related_entity_type = request.related_entity_type;
    options.related_entity_id = request.related_entity_id;
    options.metadata = request.metadata;

    let result = state
        .coordinator()
        .deduct(user_id, request.amount_minor, category, options, &context)
        .await?;

    let status = if result.is_duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((status, Json(result.into())))
}

// =========================================================================
// GET /wallets/:user_id/transactions
// =========================================================================

/// Get a user's transaction history, newest first
async fn get_transaction_history(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let page = state
        .coordinator()
        .get_transaction_history(user_id, query.limit, query.offset)
        .await?;

    Ok(Json(HistoryResponse {
        user_id,
        transactions: page.transactions.iter().map(HistoryEntry::from).collect(),
        total: page.total,
    }))
}
