mod common;

use common::*;
use renew_sync::services::renewal::run_renewal_batch;
use std::time::Duration;

const DEADLINE: Duration = Duration::from_secs(30);

// ── implicit sweep ─────────────────────────────────────────────────────────
// No explicit list: every currently-expired unpaid order is re-evaluated,
// parked ones included. The sweep walks the whole database, so it lives in
// its own binary and runs its phases sequentially.

#[tokio::test]
async fn implicit_sweep_accounts_for_every_expired_unpaid_order() {
    let pool = setup_pool("renew_sync_test_sweep").await;
    let coordinator = coordinator();
    seed_order(&pool, "DH400001", "unpaid", None, past(), None).await;
    seed_order(&pool, "DH400002", "unpaid", Some(true), past(), None).await;
    seed_order(&pool, "DH400003", "unpaid", Some(false), past(), None).await; // parked
    seed_order(&pool, "DH400004", "unpaid", None, future(), None).await; // not due
    seed_order(&pool, "DH400005", "closed", None, past(), None).await;

    let summary = run_renewal_batch(&pool, &coordinator, None, false, DEADLINE)
        .await
        .unwrap();

    let mut succeeded: Vec<_> = summary
        .succeeded
        .iter()
        .map(|e| e.order_code.clone())
        .collect();
    succeeded.sort();
    assert_eq!(succeeded, vec!["DH400001", "DH400002"]);

    // The parked order is visible in the summary, not silently dropped.
    let skipped: Vec<_> = summary.skipped.iter().map(|e| e.order_code.as_str()).collect();
    assert_eq!(skipped, vec!["DH400003"]);
    assert!(summary.failed.is_empty());

    // Forced sweep: the parked order is the only one still expired, and the
    // operator override renews it.
    let forced = run_renewal_batch(&pool, &coordinator, None, true, DEADLINE)
        .await
        .unwrap();
    let forced_codes: Vec<_> = forced.succeeded.iter().map(|e| e.order_code.as_str()).collect();
    assert_eq!(forced_codes, vec!["DH400003"], "parked order renewed by forced sweep");
    assert!(forced.succeeded[0].forced);
}
