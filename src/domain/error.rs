//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

use super::amount::AmountError;

/// Domain-specific errors
///
/// These errors represent business rule violations and domain invariant
/// failures. They are independent of the web/infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Insufficient balance for a debit operation (minor units)
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    /// Wallet is frozen or closed and cannot be debited
    #[error("Wallet is not active (status: {status})")]
    WalletNotActive { status: String },

    /// Invalid amount (zero or negative)
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Crediting would overflow the balance range
    #[error("Balance overflow")]
    BalanceOverflow,

    /// Required field missing or empty
    #[error("Validation error: {0}")]
    Validation(String),
}

impl DomainError {
    /// Create an insufficient balance error
    pub fn insufficient_balance(required: i64, available: i64) -> Self {
        Self::InsufficientBalance {
            required,
            available,
        }
    }

    /// Create a wallet-not-active error
    pub fn wallet_not_active(status: impl Into<String>) -> Self {
        Self::WalletNotActive {
            status: status.into(),
        }
    }

    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientBalance { .. }
                | Self::WalletNotActive { .. }
                | Self::InvalidAmount(_)
                | Self::Validation(_)
        )
    }
}

impl From<AmountError> for DomainError {
    fn from(err: AmountError) -> Self {
        match err {
            AmountError::Overflow => DomainError::BalanceOverflow,
            other => DomainError::InvalidAmount(other.to_string()),
        }
    }
}
