//! Ledger Errors
//!
//! Error types for ledger operations.

use uuid::Uuid;

use crate::domain::{AmountError, DomainError};
use crate::wallet::WalletStoreError;

/// Errors that can occur in the ledger coordinator
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Business rule violation
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Idempotency key reused with a different payload
    #[error("Idempotency conflict: key {reference_id} was already used by a different request")]
    IdempotencyConflict { reference_id: String },

    /// Wallet row missing where one must exist
    #[error("Wallet not found: {0}")]
    WalletNotFound(Uuid),

    /// Database error; the atomic unit guarantees no partial write
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl LedgerError {
    /// Check if this error is the caller's fault
    pub fn is_client_error(&self) -> bool {
        match self {
            LedgerError::Domain(e) => e.is_client_error(),
            LedgerError::IdempotencyConflict { .. } => true,
            _ => false,
        }
    }
}

impl From<WalletStoreError> for LedgerError {
    fn from(err: WalletStoreError) -> Self {
        match err {
            WalletStoreError::Database(e) => LedgerError::Database(e),
            WalletStoreError::NotFound(user_id) => LedgerError::WalletNotFound(user_id),
        }
    }
}

impl From<AmountError> for LedgerError {
    fn from(err: AmountError) -> Self {
        LedgerError::Domain(err.into())
    }
}
