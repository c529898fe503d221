//! Ledger module
//!
//! The append-only transaction ledger and the coordinator that owns every
//! balance-changing operation.

mod coordinator;
mod error;
pub mod models;

pub use coordinator::LedgerCoordinator;
pub use error::LedgerError;
pub use models::{
    BalanceView, DeductOptions, Transaction, TransactionCategory, TransactionPage,
    TransactionResult, TransactionStatus, TransactionType,
};
