//! Ledger Transaction Coordinator
//!
//! Wraps "read current balance under lock -> validate -> compute new
//! balance -> write wallet + write ledger row" in one atomic unit against
//! the store. The row lock serializes concurrent mutations to the same
//! wallet while leaving unrelated wallets fully concurrent; correctness
//! holds across independent processes because the lock lives in the
//! database, not in this process.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditEmitter, PgAuditEmitter, WalletAuditEvent};
use crate::domain::{Amount, Balance, DomainError, OperationContext};
use crate::idempotency::{request_fingerprint, IdempotencyResolver};
use crate::wallet::{Wallet, WalletStatus, WalletStore};

use super::error::LedgerError;
use super::models::{
    transaction_from_row, BalanceView, DeductOptions, Transaction, TransactionCategory,
    TransactionPage, TransactionResult, TransactionStatus, TransactionType,
};

/// Upper bound on a single history page
const MAX_HISTORY_PAGE: i64 = 100;

/// A validated ledger entry, ready to be written atomically
struct NewLedgerEntry {
    tx_type: TransactionType,
    amount: Amount,
    category: TransactionCategory,
    reference_id: Option<String>,
    request_hash: String,
    description: Option<String>,
    related_entity_type: Option<String>,
    related_entity_id: Option<String>,
    metadata: Option<serde_json::Value>,
}

/// Coordinator for all balance-changing operations
#[derive(Clone)]
pub struct LedgerCoordinator {
    pool: PgPool,
    store: WalletStore,
    resolver: IdempotencyResolver,
    audit: Arc<dyn AuditEmitter>,
}

impl LedgerCoordinator {
    /// Create a coordinator with the database-backed audit emitter
    pub fn new(pool: PgPool, default_currency: impl Into<String>) -> Self {
        let audit = Arc::new(PgAuditEmitter::new(pool.clone()));
        Self::with_emitter(pool, default_currency, audit)
    }

    /// Create a coordinator with an injected audit emitter
    pub fn with_emitter(
        pool: PgPool,
        default_currency: impl Into<String>,
        audit: Arc<dyn AuditEmitter>,
    ) -> Self {
        Self {
            store: WalletStore::new(pool.clone(), default_currency),
            resolver: IdempotencyResolver::new(pool.clone()),
            audit,
            pool,
        }
    }

    /// Get the wallet for a user, creating it on first access
    pub async fn get_or_create_wallet(&self, user_id: Uuid) -> Result<Wallet, LedgerError> {
        Ok(self.store.get_or_create(user_id).await?)
    }

    /// Get a user's spendable balance
    pub async fn get_balance(&self, user_id: Uuid) -> Result<BalanceView, LedgerError> {
        let wallet = self.store.get_or_create(user_id).await?;
        Ok(BalanceView {
            balance: wallet.balance,
            currency: wallet.currency,
        })
    }

    /// Credit a wallet ("top up").
    ///
    /// The idempotency key is required: a retried top-up with the same key
    /// replays the original entry instead of crediting again.
    pub async fn top_up(
        &self,
        user_id: Uuid,
        amount_minor: i64,
        idempotency_key: &str,
        metadata: Option<serde_json::Value>,
        context: &OperationContext,
    ) -> Result<TransactionResult, LedgerError> {
        // Validation happens before any lock is taken
        let amount = Amount::from_minor(amount_minor)?;
        if idempotency_key.trim().is_empty() {
            return Err(
                DomainError::Validation("idempotency key must not be empty".to_string()).into(),
            );
        }

        let wallet = self.store.get_or_create(user_id).await?;
        let fingerprint = request_fingerprint(
            TransactionType::Credit,
            amount.value(),
            &TransactionCategory::Deposit,
        );

        if let Some(existing) = self.resolver.find_by_reference(idempotency_key).await? {
            return replay(existing, idempotency_key, &fingerprint);
        }

        let entry = NewLedgerEntry {
            tx_type: TransactionType::Credit,
            amount,
            category: TransactionCategory::Deposit,
            reference_id: Some(idempotency_key.to_string()),
            request_hash: fingerprint,
            description: None,
            related_entity_type: None,
            related_entity_id: None,
            metadata,
        };

        let result = self.execute(&wallet, entry).await?;

        tracing::info!(
            user_id = %user_id,
            wallet_id = %wallet.id,
            transaction_id = %result.transaction_id,
            amount = result.amount,
            balance_after = result.balance_after,
            "Wallet credited"
        );
        self.notify_audit(AuditAction::WalletCredited, wallet.id, &result, context);

        Ok(result)
    }

    /// Debit a wallet ("deduct").
    ///
    /// Fails with `InsufficientBalance` when the amount exceeds the
    /// current balance, leaving balance and history exactly as they were;
    /// an insufficient attempt writes no ledger row at all.
    pub async fn deduct(
        &self,
        user_id: Uuid,
        amount_minor: i64,
        category: TransactionCategory,
        options: DeductOptions,
        context: &OperationContext,
    ) -> Result<TransactionResult, LedgerError> {
        let amount = Amount::from_minor(amount_minor)?;
        if options.description.trim().is_empty() {
            return Err(DomainError::Validation("description is required".to_string()).into());
        }

        let wallet = self.store.get_or_create(user_id).await?;
        let fingerprint = request_fingerprint(TransactionType::Debit, amount.value(), &category);

        // Duplicate detection is a lock-free read: a genuine retry never
        // contends for the wallet lock.
        if let Some(key) = options.idempotency_key.as_deref() {
            if let Some(existing) = self.resolver.find_by_reference(key).await? {
                return replay(existing, key, &fingerprint);
            }
        }

        if !wallet.is_active() {
            return Err(DomainError::wallet_not_active(wallet.status.as_str()).into());
        }

        let entry = NewLedgerEntry {
            tx_type: TransactionType::Debit,
            amount,
            category,
            reference_id: options.idempotency_key.clone(),
            request_hash: fingerprint,
            description: Some(options.description),
            related_entity_type: options.related_entity_type,
            related_entity_id: options.related_entity_id,
            metadata: options.metadata,
        };

        let result = self.execute(&wallet, entry).await?;

        tracing::info!(
            user_id = %user_id,
            wallet_id = %wallet.id,
            transaction_id = %result.transaction_id,
            amount = result.amount,
            balance_after = result.balance_after,
            "Wallet debited"
        );
        self.notify_audit(AuditAction::WalletDebited, wallet.id, &result, context);

        Ok(result)
    }

    /// Read a page of a user's transaction history, newest first.
    ///
    /// Pure read: a user without a wallet has an empty history and the
    /// reader never creates one.
    pub async fn get_transaction_history(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<TransactionPage, LedgerError> {
        let limit = limit.clamp(1, MAX_HISTORY_PAGE);
        let offset = offset.max(0);

        let Some(wallet) = self.store.find_by_user(user_id).await? else {
            return Ok(TransactionPage {
                transactions: Vec::new(),
                total: 0,
            });
        };

        let rows = sqlx::query(
            r#"
            SELECT id, uuid, wallet_id, tx_type, category, amount,
                   balance_before, balance_after, status, reference_id, request_hash,
                   related_entity_type, related_entity_id, description, metadata,
                   processed_at, created_at, updated_at
            FROM transactions
            WHERE wallet_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(wallet.id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM transactions WHERE wallet_id = $1"#)
                .bind(wallet.id)
                .fetch_one(&self.pool)
                .await?;

        Ok(TransactionPage {
            transactions: rows.iter().map(transaction_from_row).collect(),
            total,
        })
    }

    /// The atomic unit: lock the wallet row, validate, write the new
    /// balance and the ledger entry. All three commit together or none do;
    /// any early return rolls the transaction back untouched.
    async fn execute(
        &self,
        wallet: &Wallet,
        entry: NewLedgerEntry,
    ) -> Result<TransactionResult, LedgerError> {
        let mut tx = self.pool.begin().await?;

        let (balance_raw, status) = self.store.lock_row(&mut tx, wallet.id).await?;
        let balance = Balance::from_minor(balance_raw).map_err(DomainError::from)?;

        let balance_after = match entry.tx_type {
            TransactionType::Credit => balance.credit(&entry.amount).map_err(DomainError::from)?,
            TransactionType::Debit => {
                // Status is re-read under the lock: an admin freeze that
                // commits before the lock wins over this debit.
                if status != WalletStatus::Active {
                    return Err(DomainError::wallet_not_active(status.as_str()).into());
                }
                if !balance.is_sufficient_for(&entry.amount) {
                    return Err(DomainError::insufficient_balance(
                        entry.amount.value(),
                        balance.value(),
                    )
                    .into());
                }
                balance.debit(&entry.amount).map_err(DomainError::from)?
            }
        };

        self.store
            .apply_balance(&mut tx, wallet.id, balance_after.value())
            .await?;

        let insert = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO transactions (
                uuid, wallet_id, tx_type, category, amount,
                balance_before, balance_after, status, reference_id, request_hash,
                related_entity_type, related_entity_id, description, metadata, processed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'completed', $8, $9, $10, $11, $12, $13, NOW())
            RETURNING uuid
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(wallet.id)
        .bind(entry.tx_type.as_str())
        .bind(entry.category.as_str())
        .bind(entry.amount.value())
        .bind(balance.value())
        .bind(balance_after.value())
        .bind(&entry.reference_id)
        .bind(entry.reference_id.as_ref().map(|_| entry.request_hash.as_str()))
        .bind(&entry.related_entity_type)
        .bind(&entry.related_entity_id)
        .bind(&entry.description)
        .bind(&entry.metadata)
        .fetch_one(&mut *tx)
        .await;

        let transaction_uuid = match insert {
            Ok(uuid) => uuid,
            Err(err) if entry.reference_id.is_some() && is_unique_violation(&err) => {
                // Lost the race to a concurrent request carrying the same
                // key: this transaction rolls back and the winner's entry
                // is replayed.
                drop(tx);
                let key = entry.reference_id.as_deref().unwrap_or_default();
                return match self.resolver.find_by_reference(key).await? {
                    Some(existing) => replay(existing, key, &entry.request_hash),
                    None => Err(err.into()),
                };
            }
            Err(err) => return Err(err.into()),
        };

        tx.commit().await?;

        Ok(TransactionResult {
            transaction_id: transaction_uuid,
            amount: entry.amount.value(),
            balance_before: balance.value(),
            balance_after: balance_after.value(),
            status: TransactionStatus::Completed,
            is_duplicate: false,
        })
    }

    /// Fire-and-forget audit notification after a committed mutation
    fn notify_audit(
        &self,
        action: AuditAction,
        wallet_id: Uuid,
        result: &TransactionResult,
        context: &OperationContext,
    ) {
        // Replayed duplicates did not mutate anything
        if result.is_duplicate {
            return;
        }

        let emitter = Arc::clone(&self.audit);
        let event = WalletAuditEvent {
            action,
            wallet_id,
            transaction_id: result.transaction_id,
            amount: result.amount,
            balance_after: result.balance_after,
            context: context.clone(),
        };

        tokio::spawn(async move {
            if let Err(err) = emitter.emit(event).await {
                tracing::warn!(
                    error = %err,
                    "Audit emit failed; the mutation is already committed"
                );
            }
        });
    }
}

/// Return a previously recorded entry for a resubmitted key
fn replay(
    existing: Transaction,
    reference_id: &str,
    fingerprint: &str,
) -> Result<TransactionResult, LedgerError> {
    if existing.request_hash.as_deref() != Some(fingerprint) {
        return Err(LedgerError::IdempotencyConflict {
            reference_id: reference_id.to_string(),
        });
    }
    Ok(existing.to_result(true))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
