//! Idempotency Resolver
//!
//! Resolves a caller-supplied reference key to the transaction it already
//! produced, if any. The lookup is a plain read against the pool and never
//! takes the wallet lock, so a genuine duplicate request returns without
//! contending with live mutations.

use sqlx::PgPool;

use crate::ledger::models::{transaction_from_row, Transaction, TransactionCategory, TransactionType};

/// Resolver for idempotency keys
#[derive(Debug, Clone)]
pub struct IdempotencyResolver {
    pool: PgPool,
}

impl IdempotencyResolver {
    /// Create a new IdempotencyResolver
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the transaction previously recorded for a reference key
    pub async fn find_by_reference(
        &self,
        reference_id: &str,
    ) -> Result<Option<Transaction>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, uuid, wallet_id, tx_type, category, amount,
                   balance_before, balance_after, status, reference_id, request_hash,
                   related_entity_type, related_entity_id, description, metadata,
                   processed_at, created_at, updated_at
            FROM transactions
            WHERE reference_id = $1
            "#,
        )
        .bind(reference_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| transaction_from_row(&r)))
    }
}

/// Compute the fingerprint stored alongside a keyed transaction.
///
/// A key resubmitted with the same fingerprint replays the original entry;
/// the same key with a different fingerprint is a conflicting request and
/// is rejected rather than silently deduplicated.
pub fn request_fingerprint(
    tx_type: TransactionType,
    amount_minor: i64,
    category: &TransactionCategory,
) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(tx_type.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(amount_minor.to_be_bytes());
    hasher.update(b":");
    hasher.update(category.as_str().as_bytes());
    hex::encode(hasher.finalize())
}
