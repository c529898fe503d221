//! Ledger models
//!
//! The append-only transaction ledger: every balance change is recorded as
//! one row carrying a before/after snapshot of the wallet balance.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

/// Decimal places between the minor unit and the display unit.
const MINOR_UNIT_SCALE: u32 = 2;

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Credit => "credit",
            TransactionType::Debit => "debit",
        }
    }
}

impl From<String> for TransactionType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "debit" => TransactionType::Debit,
            _ => TransactionType::Credit,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction lifecycle status
///
/// Only `Completed` is produced by the synchronous flow. `Pending`,
/// `Failed` and `Reversed` are reserved for a future asynchronous
/// settlement path (for example a real payment-gateway callback); no
/// current code path writes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Reversed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Reversed => "reversed",
        }
    }
}

impl From<String> for TransactionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "completed" => TransactionStatus::Completed,
            "failed" => TransactionStatus::Failed,
            "reversed" => TransactionStatus::Reversed,
            _ => TransactionStatus::Pending,
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Enumerated reason for a balance change, supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionCategory {
    Deposit,
    ResumeUnlock,
    JobPromotion,
    RegistrationFee,
    Refund,
    Other(String),
}

impl TransactionCategory {
    pub fn as_str(&self) -> &str {
        match self {
            TransactionCategory::Deposit => "deposit",
            TransactionCategory::ResumeUnlock => "resume_unlock",
            TransactionCategory::JobPromotion => "job_promotion",
            TransactionCategory::RegistrationFee => "registration_fee",
            TransactionCategory::Refund => "refund",
            TransactionCategory::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for TransactionCategory {
    fn from(s: String) -> Self {
        match s.as_str() {
            "deposit" => TransactionCategory::Deposit,
            "resume_unlock" => TransactionCategory::ResumeUnlock,
            "job_promotion" => TransactionCategory::JobPromotion,
            "registration_fee" => TransactionCategory::RegistrationFee,
            "refund" => TransactionCategory::Refund,
            _ => TransactionCategory::Other(s),
        }
    }
}

impl From<TransactionCategory> for String {
    fn from(category: TransactionCategory) -> Self {
        category.as_str().to_string()
    }
}

impl std::fmt::Display for TransactionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A ledger entry
///
/// # Invariants
/// - append-only: never mutated after its status becomes terminal
/// - `balance_after = balance_before + amount` for Credit,
///   `balance_before - amount` for Debit
/// - `reference_id`, once used by a Completed entry, identifies that entry
///   forever
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Internal identity
    pub id: i64,
    /// Externally exposed handle
    pub uuid: Uuid,
    pub wallet_id: Uuid,
    pub tx_type: TransactionType,
    pub category: TransactionCategory,
    /// Positive amount in minor units
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub status: TransactionStatus,
    /// Idempotency key, unique when present
    pub reference_id: Option<String>,
    /// Fingerprint of the originating request, set for keyed entries
    #[serde(skip)]
    pub request_hash: Option<String>,
    pub related_entity_type: Option<String>,
    pub related_entity_id: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Snapshot of this entry's effect as returned to callers
    pub fn to_result(&self, is_duplicate: bool) -> TransactionResult {
        TransactionResult {
            transaction_id: self.uuid,
            amount: self.amount,
            balance_before: self.balance_before,
            balance_after: self.balance_after,
            status: self.status,
            is_duplicate,
        }
    }

    /// Amount in major units for display (e.g., 10050 paise -> 100.50)
    pub fn amount_major(&self) -> Decimal {
        Decimal::new(self.amount, MINOR_UNIT_SCALE)
    }

    /// Signed amount: positive for Credit, negative for Debit
    pub fn signed_amount(&self) -> i64 {
        match self.tx_type {
            TransactionType::Credit => self.amount,
            TransactionType::Debit => -self.amount,
        }
    }
}

/// Map a transactions row to the model
pub(crate) fn transaction_from_row(row: &PgRow) -> Transaction {
    Transaction {
        id: row.get("id"),
        uuid: row.get("uuid"),
        wallet_id: row.get("wallet_id"),
        tx_type: TransactionType::from(row.get::<String, _>("tx_type")),
        category: TransactionCategory::from(row.get::<String, _>("category")),
        amount: row.get("amount"),
        balance_before: row.get("balance_before"),
        balance_after: row.get("balance_after"),
        status: TransactionStatus::from(row.get::<String, _>("status")),
        reference_id: row.get("reference_id"),
        request_hash: row.get("request_hash"),
        related_entity_type: row.get("related_entity_type"),
        related_entity_id: row.get("related_entity_id"),
        description: row.get("description"),
        metadata: row.get("metadata"),
        processed_at: row.get("processed_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Result of a top-up or deduct, duplicate or not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResult {
    pub transaction_id: Uuid,
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub status: TransactionStatus,
    pub is_duplicate: bool,
}

/// One page of transaction history plus the total row count
#[derive(Debug, Clone)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub total: i64,
}

/// A wallet's spendable balance as exposed to collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceView {
    /// Balance in minor units
    pub balance: i64,
    pub currency: String,
}

/// Options for a debit operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeductOptions {
    /// Idempotency key. When absent the operation is at most once per
    /// call: retries are NOT deduplicated.
    pub idempotency_key: Option<String>,
    pub description: String,
    pub related_entity_type: Option<String>,
    pub related_entity_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl DeductOptions {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            idempotency_key: None,
            description: description.into(),
            related_entity_type: None,
            related_entity_id: None,
            metadata: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn with_related_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.related_entity_type = Some(entity_type.into());
        self.related_entity_id = Some(entity_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
