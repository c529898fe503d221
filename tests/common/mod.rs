//! Common test utilities

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect to the test database.
///
/// Returns None when DATABASE_URL is unset or the wallet ledger schema is
/// missing, so the calling test can skip instead of fail. Tests isolate by
/// using fresh user ids per run; no truncation is needed between runs.
pub async fn try_setup_test_db() -> Option<PgPool> {
    dotenvy::dotenv().ok();

    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("skipping: DATABASE_URL not set");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    let ready = wallet_ledger::db::check_schema(&pool)
        .await
        .expect("Schema check failed");
    if !ready {
        eprintln!("skipping: wallet ledger schema not present, run migrations first");
        return None;
    }

    Some(pool)
}
