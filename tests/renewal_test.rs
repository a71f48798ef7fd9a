mod common;

use chrono::Utc;
use common::*;
use renew_sync::domain::notify::NoopNotifier;
use renew_sync::infra::postgres::supply_repo;
use renew_sync::services::pipeline::process_transaction;
use renew_sync::services::renewal::run_renewal_batch;
use std::time::Duration;

const DEADLINE: Duration = Duration::from_secs(30);

// ── webhook-driven renewal ─────────────────────────────────────────────────
// Expired unpaid order with unset flag: a matching payment extends expiry by
// exactly one period and leaves the flag false, not true.

#[tokio::test]
async fn matching_payment_renews_expired_unpaid_order() {
    let pool = setup_pool("renew_sync_test_renewal").await;
    let coordinator = coordinator();
    let source = seed_source(&pool, "vendor-a").await;
    let expiry = past();
    seed_order(&pool, "DH100001", "unpaid", None, expiry, Some(source)).await;

    let tx = make_transaction("FT_RENEW_01", "thanh toan DH100001", 200_000);
    process_transaction(&pool, &coordinator, &NoopNotifier, &tx)
        .await
        .unwrap();

    let order = get_order(&pool, "DH100001").await;
    assert_eq!(order.status, "unpaid");
    assert_eq!(order.check_flag, Some(false), "flag not left true after renewal");
    assert_eq!(
        order.expired_at,
        expiry + chrono::Months::new(1),
        "expiry advanced by exactly one period"
    );

    // Renewal also landed in the supply balance ledger: one payment entry
    // and one renewal entry, both priced from the first transfer.
    assert_eq!(count_balance_entries(&pool, source).await, 2);
    assert_eq!(
        supply_repo::balance_for_source(&pool, source).await.unwrap(),
        400_000
    );
}

#[tokio::test]
async fn paid_status_is_reset_during_reconciliation() {
    let pool = setup_pool("renew_sync_test_renewal").await;
    let coordinator = coordinator();
    seed_order(&pool, "DH100002", "paid", None, future(), None).await;

    let tx = make_transaction("FT_RESET_01", "tt DH100002", 90_000);
    process_transaction(&pool, &coordinator, &NoopNotifier, &tx)
        .await
        .unwrap();

    let order = get_order(&pool, "DH100002").await;
    assert_eq!(order.status, "unpaid", "stale paid marker reset");
}

// ── batch retry ────────────────────────────────────────────────────────────
// One valid, one already-renewed, one unknown: the summary partition covers
// exactly those three codes with no overlap.

#[tokio::test]
async fn batch_partitions_valid_renewed_and_unknown() {
    let pool = setup_pool("renew_sync_test_renewal").await;
    let coordinator = coordinator();
    seed_order(&pool, "DH200001", "unpaid", None, past(), None).await;
    // Already renewed this pass: parked flag, expiry in the future.
    seed_order(&pool, "DH200002", "unpaid", Some(false), future(), None).await;

    let summary = run_renewal_batch(
        &pool,
        &coordinator,
        Some(vec![
            "DH200001".into(),
            "DH200002".into(),
            "DH209999".into(),
        ]),
        false,
        DEADLINE,
    )
    .await
    .unwrap();

    let succeeded: Vec<_> = summary.succeeded.iter().map(|e| e.order_code.as_str()).collect();
    let skipped: Vec<_> = summary.skipped.iter().map(|e| e.order_code.as_str()).collect();
    let failed: Vec<_> = summary.failed.iter().map(|e| e.order_code.as_str()).collect();

    assert_eq!(succeeded, vec!["DH200001"]);
    assert_eq!(skipped, vec!["DH200002"]);
    assert_eq!(failed, vec!["DH209999"]);
}

#[tokio::test]
async fn forced_batch_renewal_is_observable_in_summary() {
    let pool = setup_pool("renew_sync_test_renewal").await;
    let coordinator = coordinator();
    // Operator override: parked and not yet due, forced anyway.
    seed_order(&pool, "DH300001", "unpaid", Some(false), future(), None).await;

    let summary = run_renewal_batch(
        &pool,
        &coordinator,
        Some(vec!["DH300001".into()]),
        true,
        DEADLINE,
    )
    .await
    .unwrap();

    assert_eq!(summary.succeeded.len(), 1);
    assert!(summary.succeeded[0].forced, "force indicator visible in summary");
    assert!(summary.failed.is_empty());
    assert!(summary.skipped.is_empty());
}

#[tokio::test]
async fn check_flag_true_renews_and_reports_forced() {
    let pool = setup_pool("renew_sync_test_renewal").await;
    let coordinator = coordinator();
    seed_order(&pool, "DH300002", "unpaid", Some(true), past(), None).await;

    let summary = run_renewal_batch(
        &pool,
        &coordinator,
        Some(vec!["DH300002".into()]),
        false,
        DEADLINE,
    )
    .await
    .unwrap();

    assert_eq!(summary.succeeded.len(), 1);
    assert!(summary.succeeded[0].forced);
    let order = get_order(&pool, "DH300002").await;
    assert_eq!(order.check_flag, Some(false));
}

// ── per-code failure isolation ─────────────────────────────────────────────

#[tokio::test]
async fn failure_on_one_code_does_not_abort_the_batch() {
    let pool = setup_pool("renew_sync_test_renewal").await;
    let coordinator = coordinator();
    seed_order(&pool, "DH500002", "unpaid", None, past(), None).await;

    let summary = run_renewal_batch(
        &pool,
        &coordinator,
        Some(vec!["DH500001".into(), "DH500002".into()]),
        false,
        DEADLINE,
    )
    .await
    .unwrap();

    assert_eq!(summary.failed.len(), 1, "unknown code isolated");
    assert_eq!(summary.succeeded.len(), 1, "valid code still processed");
}

#[tokio::test]
async fn zero_deadline_reports_all_codes_skipped() {
    let pool = setup_pool("renew_sync_test_renewal").await;
    let coordinator = coordinator();
    seed_order(&pool, "DH600001", "unpaid", None, past(), None).await;

    let summary = run_renewal_batch(
        &pool,
        &coordinator,
        Some(vec!["DH600001".into()]),
        false,
        Duration::ZERO,
    )
    .await
    .unwrap();

    assert!(summary.succeeded.is_empty());
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].reason, "deadline exceeded");

    // The order was not touched.
    let order = get_order(&pool, "DH600001").await;
    assert!(order.expired_at <= Utc::now());
}
