//! Ledger Integration Tests
//!
//! Exercise the coordinator against a live database: non-negativity,
//! conservation, idempotence and isolation under concurrency. Each test
//! uses fresh user ids, so runs do not interfere with one another.

use uuid::Uuid;
use wallet_ledger::domain::{DomainError, OperationContext};
use wallet_ledger::ledger::{
    DeductOptions, LedgerCoordinator, LedgerError, TransactionCategory, TransactionType,
};

mod common;

fn coordinator(pool: sqlx::PgPool) -> LedgerCoordinator {
    LedgerCoordinator::new(pool, "INR")
}

fn unique_key(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4())
}

#[tokio::test]
async fn test_new_user_balance_is_zero() {
    let Some(pool) = common::try_setup_test_db().await else {
        return;
    };
    let ledger = coordinator(pool);
    let user_id = Uuid::new_v4();

    let view = ledger.get_balance(user_id).await.unwrap();
    assert_eq!(view.balance, 0);
    assert_eq!(view.currency, "INR");

    // The wallet was created lazily and is stable across accesses
    let first = ledger.get_or_create_wallet(user_id).await.unwrap();
    let second = ledger.get_or_create_wallet(user_id).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.balance, 0);
}

#[tokio::test]
async fn test_concurrent_wallet_creation_yields_one_row() {
    let Some(pool) = common::try_setup_test_db().await else {
        return;
    };
    let ledger = coordinator(pool);
    let user_id = Uuid::new_v4();

    let (a, b) = tokio::join!(
        ledger.get_or_create_wallet(user_id),
        ledger.get_or_create_wallet(user_id)
    );

    assert_eq!(a.unwrap().id, b.unwrap().id);
}

#[tokio::test]
async fn test_top_up_and_duplicate_replay() {
    let Some(pool) = common::try_setup_test_db().await else {
        return;
    };
    let ledger = coordinator(pool);
    let user_id = Uuid::new_v4();
    let context = OperationContext::new();
    let key = unique_key("topup");

    let first = ledger
        .top_up(user_id, 10_000, &key, None, &context)
        .await
        .unwrap();
    assert!(!first.is_duplicate);
    assert_eq!(first.balance_before, 0);
    assert_eq!(first.balance_after, 10_000);

    // Same key again: the original entry is replayed, nothing is credited
    let second = ledger
        .top_up(user_id, 10_000, &key, None, &context)
        .await
        .unwrap();
    assert!(second.is_duplicate);
    assert_eq!(second.transaction_id, first.transaction_id);
    assert_eq!(second.balance_after, 10_000);

    let view = ledger.get_balance(user_id).await.unwrap();
    assert_eq!(view.balance, 10_000);

    // Exactly one ledger row exists for the key
    let page = ledger
        .get_transaction_history(user_id, 50, 0)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn test_idempotency_conflict_on_changed_payload() {
    let Some(pool) = common::try_setup_test_db().await else {
        return;
    };
    let ledger = coordinator(pool);
    let user_id = Uuid::new_v4();
    let context = OperationContext::new();
    let key = unique_key("conflict");

    ledger
        .top_up(user_id, 10_000, &key, None, &context)
        .await
        .unwrap();

    // Same key, different amount: rejected, not silently deduplicated
    let result = ledger.top_up(user_id, 20_000, &key, None, &context).await;
    assert!(matches!(
        result,
        Err(LedgerError::IdempotencyConflict { .. })
    ));

    let view = ledger.get_balance(user_id).await.unwrap();
    assert_eq!(view.balance, 10_000);
}

#[tokio::test]
async fn test_deduct_records_balance_snapshots() {
    let Some(pool) = common::try_setup_test_db().await else {
        return;
    };
    let ledger = coordinator(pool);
    let user_id = Uuid::new_v4();
    let context = OperationContext::new();

    ledger
        .top_up(user_id, 10_000, &unique_key("topup"), None, &context)
        .await
        .unwrap();

    let options = DeductOptions::new("unlock").with_idempotency_key(unique_key("deduct"));
    let result = ledger
        .deduct(
            user_id,
            5_000,
            TransactionCategory::ResumeUnlock,
            options,
            &context,
        )
        .await
        .unwrap();

    assert!(!result.is_duplicate);
    assert_eq!(result.balance_before, 10_000);
    assert_eq!(result.balance_after, 5_000);

    let page = ledger
        .get_transaction_history(user_id, 50, 0)
        .await
        .unwrap();
    assert_eq!(page.total, 2);

    // Newest first: the debit precedes the credit in the page
    let newest = &page.transactions[0];
    assert_eq!(newest.tx_type, TransactionType::Debit);
    assert_eq!(newest.category, TransactionCategory::ResumeUnlock);
    assert_eq!(newest.balance_before, 10_000);
    assert_eq!(newest.balance_after, 5_000);
    assert_eq!(newest.description.as_deref(), Some("unlock"));
}

#[tokio::test]
async fn test_insufficient_balance_leaves_no_trace() {
    let Some(pool) = common::try_setup_test_db().await else {
        return;
    };
    let ledger = coordinator(pool);
    let user_id = Uuid::new_v4();
    let context = OperationContext::new();

    ledger
        .top_up(user_id, 5_000, &unique_key("topup"), None, &context)
        .await
        .unwrap();

    let options = DeductOptions::new("unlock2");
    let result = ledger
        .deduct(
            user_id,
            6_000,
            TransactionCategory::ResumeUnlock,
            options,
            &context,
        )
        .await;

    match result {
        Err(LedgerError::Domain(DomainError::InsufficientBalance {
            required,
            available,
        })) => {
            assert_eq!(required, 6_000);
            assert_eq!(available, 5_000);
        }
        other => panic!("expected InsufficientBalance, got {:?}", other.map(|_| ())),
    }

    // Balance and history stay exactly as they were: no Failed row either
    let view = ledger.get_balance(user_id).await.unwrap();
    assert_eq!(view.balance, 5_000);

    let page = ledger
        .get_transaction_history(user_id, 50, 0)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn test_concurrent_deducts_exactly_one_succeeds() {
    let Some(pool) = common::try_setup_test_db().await else {
        return;
    };
    let ledger = coordinator(pool);
    let user_id = Uuid::new_v4();
    let context = OperationContext::new();

    ledger
        .top_up(user_id, 5_000, &unique_key("topup"), None, &context)
        .await
        .unwrap();

    let first = ledger.deduct(
        user_id,
        5_000,
        TransactionCategory::JobPromotion,
        DeductOptions::new("promote job").with_idempotency_key(unique_key("deduct_a")),
        &context,
    );
    let second = ledger.deduct(
        user_id,
        5_000,
        TransactionCategory::JobPromotion,
        DeductOptions::new("promote job").with_idempotency_key(unique_key("deduct_b")),
        &context,
    );

    let (a, b) = tokio::join!(first, second);

    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one concurrent deduct may win");

    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(
        loser,
        Err(LedgerError::Domain(DomainError::InsufficientBalance { .. }))
    ));

    let view = ledger.get_balance(user_id).await.unwrap();
    assert_eq!(view.balance, 0);
}

#[tokio::test]
async fn test_balance_equals_sum_of_completed_entries() {
    let Some(pool) = common::try_setup_test_db().await else {
        return;
    };
    let ledger = coordinator(pool);
    let user_id = Uuid::new_v4();
    let context = OperationContext::new();

    ledger
        .top_up(user_id, 10_000, &unique_key("topup"), None, &context)
        .await
        .unwrap();
    ledger
        .top_up(user_id, 2_500, &unique_key("topup"), None, &context)
        .await
        .unwrap();
    ledger
        .deduct(
            user_id,
            4_000,
            TransactionCategory::ResumeUnlock,
            DeductOptions::new("unlock").with_idempotency_key(unique_key("deduct")),
            &context,
        )
        .await
        .unwrap();
    ledger
        .deduct(
            user_id,
            1_500,
            TransactionCategory::JobPromotion,
            DeductOptions::new("promote").with_idempotency_key(unique_key("deduct")),
            &context,
        )
        .await
        .unwrap();

    let page = ledger
        .get_transaction_history(user_id, 100, 0)
        .await
        .unwrap();
    let ledger_sum: i64 = page.transactions.iter().map(|t| t.signed_amount()).sum();

    let view = ledger.get_balance(user_id).await.unwrap();
    assert_eq!(view.balance, ledger_sum);
    assert_eq!(view.balance, 7_000);

    // Every entry's snapshot is internally consistent
    for tx in &page.transactions {
        assert_eq!(tx.balance_before + tx.signed_amount(), tx.balance_after);
    }
}

#[tokio::test]
async fn test_frozen_wallet_rejects_deduct() {
    let Some(pool) = common::try_setup_test_db().await else {
        return;
    };
    let ledger = coordinator(pool.clone());
    let user_id = Uuid::new_v4();
    let context = OperationContext::new();

    ledger
        .top_up(user_id, 10_000, &unique_key("topup"), None, &context)
        .await
        .unwrap();

    // An administrative collaborator freezes the wallet out of band
    sqlx::query("UPDATE wallets SET status = 'frozen', updated_at = NOW() WHERE user_id = $1")
        .bind(user_id)
        .execute(&pool)
        .await
        .unwrap();

    let result = ledger
        .deduct(
            user_id,
            1_000,
            TransactionCategory::ResumeUnlock,
            DeductOptions::new("unlock"),
            &context,
        )
        .await;

    assert!(matches!(
        result,
        Err(LedgerError::Domain(DomainError::WalletNotActive { .. }))
    ));

    // Top-ups are not status-gated: a frozen wallet can still receive funds
    let credited = ledger
        .top_up(user_id, 500, &unique_key("topup"), None, &context)
        .await
        .unwrap();
    assert_eq!(credited.balance_after, 10_500);
}

#[tokio::test]
async fn test_deduct_without_key_is_not_deduplicated() {
    let Some(pool) = common::try_setup_test_db().await else {
        return;
    };
    let ledger = coordinator(pool);
    let user_id = Uuid::new_v4();
    let context = OperationContext::new();

    ledger
        .top_up(user_id, 10_000, &unique_key("topup"), None, &context)
        .await
        .unwrap();

    // No idempotency key: each call is its own mutation
    for _ in 0..2 {
        ledger
            .deduct(
                user_id,
                2_000,
                TransactionCategory::ResumeUnlock,
                DeductOptions::new("unlock"),
                &context,
            )
            .await
            .unwrap();
    }

    let view = ledger.get_balance(user_id).await.unwrap();
    assert_eq!(view.balance, 6_000);

    let page = ledger
        .get_transaction_history(user_id, 50, 0)
        .await
        .unwrap();
    assert_eq!(page.total, 3);
}

#[tokio::test]
async fn test_history_pagination_newest_first() {
    let Some(pool) = common::try_setup_test_db().await else {
        return;
    };
    let ledger = coordinator(pool);
    let user_id = Uuid::new_v4();
    let context = OperationContext::new();

    ledger
        .top_up(user_id, 10_000, &unique_key("topup"), None, &context)
        .await
        .unwrap();
    for amount in [1_000i64, 2_000, 3_000] {
        ledger
            .deduct(
                user_id,
                amount,
                TransactionCategory::ResumeUnlock,
                DeductOptions::new("unlock").with_idempotency_key(unique_key("deduct")),
                &context,
            )
            .await
            .unwrap();
    }

    let first_page = ledger.get_transaction_history(user_id, 2, 0).await.unwrap();
    assert_eq!(first_page.total, 4);
    assert_eq!(first_page.transactions.len(), 2);
    // Newest first: the 3000 deduct leads
    assert_eq!(first_page.transactions[0].amount, 3_000);
    assert_eq!(first_page.transactions[1].amount, 2_000);

    let second_page = ledger.get_transaction_history(user_id, 2, 2).await.unwrap();
    assert_eq!(second_page.transactions.len(), 2);
    assert_eq!(second_page.transactions[0].amount, 1_000);
    assert_eq!(second_page.transactions[1].amount, 10_000);

    // A user without a wallet has an empty history and none is created
    let stranger = Uuid::new_v4();
    let empty = ledger
        .get_transaction_history(stranger, 50, 0)
        .await
        .unwrap();
    assert_eq!(empty.total, 0);
    assert!(empty.transactions.is_empty());
}

#[tokio::test]
async fn test_validation_rejected_before_any_mutation() {
    let Some(pool) = common::try_setup_test_db().await else {
        return;
    };
    let ledger = coordinator(pool);
    let user_id = Uuid::new_v4();
    let context = OperationContext::new();

    let zero = ledger.top_up(user_id, 0, "some_key", None, &context).await;
    assert!(matches!(
        zero,
        Err(LedgerError::Domain(DomainError::InvalidAmount(_)))
    ));

    let negative = ledger
        .deduct(
            user_id,
            -100,
            TransactionCategory::ResumeUnlock,
            DeductOptions::new("unlock"),
            &context,
        )
        .await;
    assert!(matches!(
        negative,
        Err(LedgerError::Domain(DomainError::InvalidAmount(_)))
    ));

    let blank_description = ledger
        .deduct(
            user_id,
            100,
            TransactionCategory::ResumeUnlock,
            DeductOptions::new("   "),
            &context,
        )
        .await;
    assert!(matches!(
        blank_description,
        Err(LedgerError::Domain(DomainError::Validation(_)))
    ));
}

#[tokio::test]
async fn test_audit_log_written_after_deduct() {
    let Some(pool) = common::try_setup_test_db().await else {
        return;
    };
    let ledger = coordinator(pool.clone());
    let user_id = Uuid::new_v4();
    let context = OperationContext::new().with_request_user(user_id);

    ledger
        .top_up(user_id, 10_000, &unique_key("topup"), None, &context)
        .await
        .unwrap();
    let result = ledger
        .deduct(
            user_id,
            5_000,
            TransactionCategory::JobPromotion,
            DeductOptions::new("promote").with_idempotency_key(unique_key("deduct")),
            &context,
        )
        .await
        .unwrap();

    // The emitter runs detached; poll briefly for its row
    let mut found = false;
    for _ in 0..20 {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM audit_logs WHERE transaction_uuid = $1")
                .bind(result.transaction_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        if count == 1 {
            found = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    assert!(found, "audit log entry for the deduct never appeared");
}
