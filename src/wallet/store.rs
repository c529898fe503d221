//! Wallet Store
//!
//! One balance row per user, lazily created on first access. All balance
//! writes go through the ledger coordinator; the store only creates, reads
//! and applies already-computed balances inside the coordinator's
//! transaction.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::models::{Wallet, WalletStatus};

/// Wallet store errors
#[derive(Debug, thiserror::Error)]
pub enum WalletStoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Wallet not found for user {0}")]
    NotFound(Uuid),
}

type WalletRow = (
    Uuid,
    Uuid,
    i64,
    String,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn row_to_wallet(row: WalletRow) -> Wallet {
    let (id, user_id, balance, currency, status, created_at, updated_at) = row;
    Wallet {
        id,
        user_id,
        balance,
        currency,
        status: WalletStatus::from(status),
        created_at,
        updated_at,
    }
}

/// Repository for wallet rows
#[derive(Debug, Clone)]
pub struct WalletStore {
    pool: PgPool,
    default_currency: String,
}

impl WalletStore {
    /// Create a new WalletStore
    pub fn new(pool: PgPool, default_currency: impl Into<String>) -> Self {
        Self {
            pool,
            default_currency: default_currency.into(),
        }
    }

    /// Get the wallet for a user, creating it on first access.
    ///
    /// Safe under concurrent calls for the same new user: the unique
    /// constraint on `user_id` admits a single row, the losing insert is a
    /// no-op, and the follow-up read returns the winner's row.
    pub async fn get_or_create(&self, user_id: Uuid) -> Result<Wallet, WalletStoreError> {
        sqlx::query(
            r#"
            INSERT INTO wallets (id, user_id, balance, currency, status)
            VALUES ($1, $2, 0, $3, 'active')
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&self.default_currency)
        .execute(&self.pool)
        .await?;

        self.find_by_user(user_id)
            .await?
            .ok_or(WalletStoreError::NotFound(user_id))
    }

    /// Fetch a wallet without creating it
    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Wallet>, WalletStoreError> {
        let row: Option<WalletRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, balance, currency, status, created_at, updated_at
            FROM wallets
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_wallet))
    }

    /// Read a wallet's balance and status under an exclusive row lock.
    ///
    /// Must be called inside the coordinator's transaction; the lock is
    /// held until that transaction commits or rolls back, serializing
    /// concurrent mutations of the same wallet.
    pub async fn lock_row(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        wallet_id: Uuid,
    ) -> Result<(i64, WalletStatus), WalletStoreError> {
        let row: Option<(i64, String)> = sqlx::query_as(
            r#"
            SELECT balance, status
            FROM wallets
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(wallet_id)
        .fetch_optional(&mut **tx)
        .await?;

        let (balance, status) = row.ok_or(WalletStoreError::NotFound(wallet_id))?;
        Ok((balance, WalletStatus::from(status)))
    }

    /// Write a new balance for a locked wallet row.
    ///
    /// Only the coordinator calls this, with the row already locked by
    /// `lock_row` in the same transaction.
    pub async fn apply_balance(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        wallet_id: Uuid,
        new_balance: i64,
    ) -> Result<(), WalletStoreError> {
        sqlx::query(
            r#"
            UPDATE wallets
            SET balance = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(wallet_id)
        .bind(new_balance)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
