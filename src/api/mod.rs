//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use sqlx::PgPool;

use crate::ledger::LedgerCoordinator;

pub use routes::create_router;

/// Shared state for route handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub default_currency: String,
}

impl AppState {
    pub fn new(pool: PgPool, default_currency: impl Into<String>) -> Self {
        Self {
            pool,
            default_currency: default_currency.into(),
        }
    }

    /// Build a coordinator bound to this state's pool
    pub fn coordinator(&self) -> LedgerCoordinator {
        LedgerCoordinator::new(self.pool.clone(), self.default_currency.clone())
    }
}
