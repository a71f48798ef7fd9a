use {
    crate::domain::{error::PipelineError, order},
    crate::infra::postgres::order_repo,
    crate::services::coordinator::RenewalCoordinator,
    chrono::{DateTime, Utc},
    serde::Serialize,
    sqlx::PgPool,
    std::sync::Arc,
    std::time::Duration,
    tokio::time::Instant,
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum RenewalOutcome {
    /// Expiry extended by one billing period.
    Renewed {
        forced: bool,
        new_expired_at: DateTime<Utc>,
    },
    /// Unpaid, unset flag, not yet due — flag marked false instead.
    Parked,
    /// Not in a renewable state; nothing changed.
    NotEligible { status: String },
    /// Another task for this code was already in flight.
    Coalesced,
    /// No order carries this code.
    UnknownOrder,
}

/// Evaluate one order code and drive it through the state machine: fetch
/// state, decide the transition, apply the status reset when flagged, then
/// renew / park / skip. `force_override` is the operator override from the
/// batch-retry endpoint; it renews an unpaid order regardless of flag and
/// expiry, like a check flag already set true.
pub async fn process_order_code(
    pool: &PgPool,
    coordinator: &Arc<RenewalCoordinator>,
    order_code: &str,
    force_override: bool,
    now: DateTime<Utc>,
) -> Result<RenewalOutcome, PipelineError> {
    let Some(state) = order_repo::fetch_order_state(pool, order_code).await? else {
        return Ok(RenewalOutcome::UnknownOrder);
    };

    let mut decision = order::evaluate(state.status, state.check_flag, state.is_expired(now));
    if force_override && state.status == order::OrderStatus::Unpaid {
        decision.eligible = true;
        decision.force_renewal = true;
    }

    // Applied independent of whether renewal below succeeds.
    if decision.needs_status_reset {
        order_repo::set_status_unpaid(pool, order_code).await?;
        tracing::info!(order_code, "stale paid status reset to unpaid");
    }

    if decision.eligible {
        let Some(guard) = coordinator.begin(order_code) else {
            tracing::info!(order_code, "renewal already in flight, coalesced");
            return Ok(RenewalOutcome::Coalesced);
        };

        let result = order_repo::run_renewal_tx(pool, order_code, force_override, now).await;
        drop(guard);

        return match result? {
            order_repo::RenewalTxResult::Renewed(new_expired_at) => {
                tracing::info!(
                    order_code,
                    forced = decision.force_renewal,
                    %new_expired_at,
                    "order renewed"
                );
                Ok(RenewalOutcome::Renewed {
                    forced: decision.force_renewal,
                    new_expired_at,
                })
            }
            // Another delivery renewed first; nothing left to do.
            order_repo::RenewalTxResult::NotRenewable => Ok(RenewalOutcome::NotEligible {
                status: decision.status.to_string(),
            }),
            order_repo::RenewalTxResult::Missing => Ok(RenewalOutcome::UnknownOrder),
        };
    }

    if decision.should_park(state.check_flag) {
        order_repo::mark_check_flag_false(pool, order_code).await?;
        tracing::info!(order_code, "order parked, not yet due");
        return Ok(RenewalOutcome::Parked);
    }

    Ok(RenewalOutcome::NotEligible {
        status: decision.status.to_string(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct SucceededEntry {
    pub order_code: String,
    pub forced: bool,
    pub new_expired_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedEntry {
    pub order_code: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedEntry {
    pub order_code: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub succeeded: Vec<SucceededEntry>,
    pub failed: Vec<FailedEntry>,
    pub skipped: Vec<SkippedEntry>,
}

/// Re-drive the renewal pipeline over an explicit code list, or over every
/// currently-expired unpaid order when none is given. Per-code failures land
/// in the summary and never abort the sweep; codes left when the deadline
/// passes are reported as skipped.
pub async fn run_renewal_batch(
    pool: &PgPool,
    coordinator: &Arc<RenewalCoordinator>,
    order_codes: Option<Vec<String>>,
    force: bool,
    deadline: Duration,
) -> Result<BatchSummary, PipelineError> {
    let now = Utc::now();
    let codes = match order_codes {
        Some(codes) => codes,
        None => order_repo::expired_unpaid_codes(pool, now).await?,
    };

    let started = Instant::now();
    let mut summary = BatchSummary::default();

    for order_code in codes {
        if started.elapsed() >= deadline {
            summary.skipped.push(SkippedEntry {
                order_code,
                reason: "deadline exceeded".into(),
            });
            continue;
        }

        match process_order_code(pool, coordinator, &order_code, force, now).await {
            Ok(RenewalOutcome::Renewed {
                forced,
                new_expired_at,
            }) => summary.succeeded.push(SucceededEntry {
                order_code,
                forced,
                new_expired_at,
            }),
            Ok(RenewalOutcome::UnknownOrder) => summary.failed.push(FailedEntry {
                order_code,
                error: "unknown order code".into(),
            }),
            Ok(RenewalOutcome::Parked) => summary.skipped.push(SkippedEntry {
                order_code,
                reason: "parked, not yet due".into(),
            }),
            Ok(RenewalOutcome::Coalesced) => summary.skipped.push(SkippedEntry {
                order_code,
                reason: "already in flight".into(),
            }),
            Ok(RenewalOutcome::NotEligible { status }) => summary.skipped.push(SkippedEntry {
                order_code,
                reason: format!("not eligible, status {status}"),
            }),
            Err(e) => {
                tracing::warn!(order_code = %order_code, error = %e, "batch renewal failed for code");
                summary.failed.push(FailedEntry {
                    order_code,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(summary)
}
