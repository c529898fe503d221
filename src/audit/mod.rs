//! Audit Emitter
//!
//! Best-effort notification of committed wallet mutations. The emitter is
//! called fire-and-forget after a successful mutation; its failure is
//! logged and never rolls back or fails the financial operation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::OperationContext;

/// Audit action types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    WalletCredited,
    WalletDebited,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::WalletCredited => "wallet.credited",
            AuditAction::WalletDebited => "wallet.debited",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A committed wallet mutation, as reported to the audit trail
#[derive(Debug, Clone)]
pub struct WalletAuditEvent {
    pub action: AuditAction,
    pub wallet_id: Uuid,
    pub transaction_id: Uuid,
    /// Amount in minor units
    pub amount: i64,
    pub balance_after: i64,
    pub context: OperationContext,
}

/// Audit errors
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Receiver of post-commit mutation notifications.
///
/// Implementations must tolerate being invoked from a detached task; the
/// coordinator never awaits the result on the request path.
#[async_trait]
pub trait AuditEmitter: Send + Sync {
    async fn emit(&self, event: WalletAuditEvent) -> Result<(), AuditError>;
}

/// Audit emitter backed by the audit_logs table
#[derive(Debug, Clone)]
pub struct PgAuditEmitter {
    pool: PgPool,
}

impl PgAuditEmitter {
    /// Create a new PgAuditEmitter
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditEmitter for PgAuditEmitter {
    async fn emit(&self, event: WalletAuditEvent) -> Result<(), AuditError> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, request_user_id, correlation_id, action,
                wallet_id, transaction_uuid, amount, balance_after, client_ip
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(event.context.request_user_id)
        .bind(event.context.correlation_id)
        .bind(event.action.as_str())
        .bind(event.wallet_id)
        .bind(event.transaction_id)
        .bind(event.amount)
        .bind(event.balance_after)
        .bind(event.context.client_ip.map(|ip| ip.to_string()))
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            audit_id = %id,
            action = %event.action,
            transaction_id = %event.transaction_id,
            "Audit log entry created"
        );

        Ok(())
    }
}

/// Emitter that drops every event, for tests and local tooling
#[derive(Debug, Clone, Default)]
pub struct NoopAuditEmitter;

#[async_trait]
impl AuditEmitter for NoopAuditEmitter {
    async fn emit(&self, _event: WalletAuditEvent) -> Result<(), AuditError> {
        Ok(())
    }
}
