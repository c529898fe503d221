//! wallet_ledger Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod audit;
pub mod domain;
pub mod idempotency;
pub mod ledger;
pub mod wallet;

// Infrastructure modules (used by the binaries)
pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use domain::{Amount, AmountError, Balance, DomainError, OperationContext};
pub use error::{AppError, AppResult};
pub use ledger::{LedgerCoordinator, LedgerError, TransactionResult};
