//! Wallet module
//!
//! The per-user balance record and its store.

pub mod models;
mod store;

pub use models::{Wallet, WalletStatus};
pub use store::{WalletStore, WalletStoreError};
