use {
    crate::{
        AppState,
        adapters::{api_errors::ApiError, auth},
        domain::{error::PipelineError, transaction::BankTransaction},
        services::{pipeline, renewal},
    },
    axum::{
        Json,
        body::Bytes,
        extract::{Query, State},
        http::HeaderMap,
    },
    serde::Deserialize,
    std::collections::HashMap,
};

/// Liveness/documentation probe for gateway configuration checks.
pub async fn webhook_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "renew_sync",
        "endpoint": "POST /webhook",
        "auth": "HMAC-SHA256 signature over the raw body, or X-API-KEY",
    }))
}

#[tracing::instrument(
    name = "webhook",
    skip_all,
    fields(reference = tracing::field::Empty, order_code = tracing::field::Empty)
)]
pub async fn webhook_handler(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    // Authenticity is settled against the raw bytes before any parsing.
    if !auth::is_authentic(&body, &headers, &query, &state.webhook_secret, &state.api_key) {
        return Err(PipelineError::Unauthorized(
            "signature and api key both rejected".into(),
        )
        .into());
    }

    let raw: serde_json::Value =
        serde_json::from_slice(&body).map_err(|_| PipelineError::Validation("body is not JSON".into()))?;

    let Some(tx) = BankTransaction::normalize(&raw) else {
        return Err(PipelineError::Validation("no transaction in payload".into()).into());
    };

    tracing::Span::current()
        .record("reference", tracing::field::display(&tx.reference_id))
        .record(
            "order_code",
            tracing::field::display(tx.derive_order_code().as_deref().unwrap_or("-")),
        );

    match pipeline::process_transaction(&state.pool, &state.coordinator, &*state.notifier, &tx)
        .await?
    {
        pipeline::WebhookOutcome::Recorded { receipt_id, renewal } => {
            tracing::info!(%receipt_id, ?renewal, "webhook processed");
            Ok(Json(serde_json::json!({"message": "OK"})))
        }
        pipeline::WebhookOutcome::Duplicate => {
            // Replayed delivery: the gateway retried, the receipt already
            // exists. Answer OK so it stops retrying.
            Ok(Json(serde_json::json!({"message": "OK", "duplicate": true})))
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct RetryRequest {
    pub orders: Option<Vec<String>>,
    #[serde(default)]
    pub force: bool,
}

/// Operator re-trigger: re-evaluates renewal eligibility over an explicit
/// code list, or over all expired unpaid orders. API key only — the gateway
/// never calls this.
pub async fn retry_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RetryRequest>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !auth::is_valid_api_key(&headers, &state.api_key) {
        return Err(PipelineError::Unauthorized("api key rejected".into()).into());
    }

    let request = body.map(|Json(r)| r).unwrap_or_default();
    let summary = renewal::run_renewal_batch(
        &state.pool,
        &state.coordinator,
        request.orders,
        request.force,
        state.batch_deadline,
    )
    .await?;

    tracing::info!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        skipped = summary.skipped.len(),
        "renewal batch finished"
    );

    let mut response = serde_json::json!({"message": "OK"});
    let summary_json = serde_json::to_value(&summary).map_err(PipelineError::from)?;
    if let (Some(obj), Some(extra)) = (response.as_object_mut(), summary_json.as_object()) {
        for (k, v) in extra {
            obj.insert(k.clone(), v.clone());
        }
    }
    Ok(Json(response))
}
