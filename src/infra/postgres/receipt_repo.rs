use {
    crate::domain::{error::PipelineError, receipt::NewReceipt},
    sqlx::PgPool,
};

/// Insert a payment receipt. Returns `false` when the upstream reference was
/// already recorded (duplicate webhook delivery) — the single load-bearing
/// idempotency point of the webhook path. The uniqueness constraint lives in
/// the schema; a conflict is success, not an error.
pub async fn insert(pool: &PgPool, receipt: &NewReceipt) -> Result<bool, PipelineError> {
    let inserted: Option<bool> = sqlx::query_scalar(
        r#"
        INSERT INTO receipts (id, reference_id, order_code, amount, sender, narrative, paid_at, raw)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (reference_id) DO NOTHING
        RETURNING true
        "#,
    )
    .bind(receipt.id)
    .bind(&receipt.reference_id)
    .bind(&receipt.order_code)
    .bind(receipt.amount.units())
    .bind(&receipt.sender)
    .bind(&receipt.narrative)
    .bind(receipt.paid_at)
    .bind(&receipt.raw)
    .fetch_optional(pool)
    .await?;

    Ok(inserted.is_some())
}

pub async fn count_for_reference(pool: &PgPool, reference_id: &str) -> Result<i64, PipelineError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM receipts WHERE reference_id = $1")
        .bind(reference_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
