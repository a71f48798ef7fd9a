use {
    crate::domain::{
        error::PipelineError, notify::Notifier, receipt::NewReceipt, transaction::BankTransaction,
    },
    crate::infra::postgres::{receipt_repo, supply_repo},
    crate::services::{coordinator::RenewalCoordinator, renewal},
    chrono::Utc,
    sqlx::PgPool,
    std::sync::Arc,
    uuid::Uuid,
};

#[derive(Debug)]
pub enum WebhookOutcome {
    /// Receipt persisted; renewal outcome attached when the pipeline got
    /// that far (None when no order code was derivable or reconciliation
    /// was skipped).
    Recorded {
        receipt_id: Uuid,
        renewal: Option<renewal::RenewalOutcome>,
    },
    /// Upstream reference already recorded — replayed delivery, nothing new.
    Duplicate,
}

/// Drive one normalized transaction through the full path: durable receipt,
/// best-effort notification, supply/price reconciliation, renewal state
/// machine. Only receipt persistence decides the request's fate; every later
/// step degrades to a log line.
pub async fn process_transaction(
    pool: &PgPool,
    coordinator: &Arc<RenewalCoordinator>,
    notifier: &dyn Notifier,
    tx: &BankTransaction,
) -> Result<WebhookOutcome, PipelineError> {
    let receipt = NewReceipt::from_transaction(tx);

    if !receipt_repo::insert(pool, &receipt).await? {
        tracing::info!(reference = %receipt.reference_id, "duplicate delivery, receipt already recorded");
        return Ok(WebhookOutcome::Duplicate);
    }
    tracing::info!(
        reference = %receipt.reference_id,
        order_code = receipt.order_code.as_deref().unwrap_or("-"),
        amount = %receipt.amount,
        "receipt recorded"
    );

    // Isolated fire-and-forget step: failures are captured here and never
    // unwind the committed receipt.
    if let Err(e) = notifier.notify_payment(&receipt).await {
        tracing::warn!(reference = %receipt.reference_id, error = %e, "payment notification failed");
    }

    let Some(order_code) = receipt.order_code.as_deref() else {
        tracing::info!(reference = %receipt.reference_id, "no order code in narrative, renewal skipped");
        return Ok(WebhookOutcome::Recorded {
            receipt_id: receipt.id,
            renewal: None,
        });
    };

    match supply_repo::ensure_supply_and_price_from_order(pool, order_code, receipt.amount).await {
        Ok(Some((source_id, price))) => {
            if let Err(e) =
                supply_repo::update_payment_supply_balance(pool, source_id, price, receipt.paid_at)
                    .await
            {
                tracing::warn!(order_code, error = %e, "supply balance update failed");
            }
        }
        Ok(None) => {
            tracing::warn!(order_code, "no supply source for order, balance not updated");
        }
        Err(e) => {
            tracing::warn!(order_code, error = %e, "supply reconciliation failed");
        }
    }

    // Renewal failures are logged per code; the payment is already recorded,
    // so the webhook outcome stays successful.
    let renewal = match renewal::process_order_code(pool, coordinator, order_code, false, Utc::now())
        .await
    {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            tracing::warn!(order_code, error = %e, "renewal pipeline failed");
            None
        }
    };

    Ok(WebhookOutcome::Recorded {
        receipt_id: receipt.id,
        renewal,
    })
}
