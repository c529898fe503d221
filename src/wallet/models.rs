//! Wallet models
//!
//! The single mutable balance record per user that the ledger explains.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wallet lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletStatus {
    Active,
    Frozen,
    Closed,
}

impl WalletStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletStatus::Active => "active",
            WalletStatus::Frozen => "frozen",
            WalletStatus::Closed => "closed",
        }
    }
}

impl From<String> for WalletStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "active" => WalletStatus::Active,
            "frozen" => WalletStatus::Frozen,
            // Unknown values refuse debits
            _ => WalletStatus::Closed,
        }
    }
}

impl std::fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user's wallet row
///
/// # Invariants
/// - `balance >= 0` in minor units after any committed mutation
/// - exactly one wallet per user (unique `user_id`)
/// - never deleted, only transitioned to `Frozen`/`Closed` by an
///   administrative collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Balance in minor currency units (paise)
    pub balance: i64,
    pub currency: String,
    pub status: WalletStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Check if the wallet can be debited
    pub fn is_active(&self) -> bool {
        self.status == WalletStatus::Active
    }
}
