use {
    crate::domain::{error::PipelineError, money::Amount},
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    uuid::Uuid,
};

/// Resolve an order's supply source and its price for the current import
/// batch. When the source has no recorded price yet, the normalized transfer
/// amount (`reference_import`) becomes the price. `None` for unknown codes
/// and for orders with no supply source.
pub async fn ensure_supply_and_price_from_order(
    pool: &PgPool,
    order_code: &str,
    reference_import: Amount,
) -> Result<Option<(Uuid, i64)>, PipelineError> {
    let source_id: Option<Option<Uuid>> =
        sqlx::query_scalar("SELECT supply_source_id FROM orders WHERE order_code = $1")
            .bind(order_code)
            .fetch_optional(pool)
            .await?;

    let Some(Some(source_id)) = source_id else {
        return Ok(None);
    };

    let existing: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT price FROM supply_prices
        WHERE supply_source_id = $1
        ORDER BY recorded_at DESC
        LIMIT 1
        "#,
    )
    .bind(source_id)
    .fetch_optional(pool)
    .await?;

    let price = match existing {
        Some(price) => price,
        None => {
            let price = reference_import.units();
            sqlx::query(
                r#"
                INSERT INTO supply_prices (id, supply_source_id, price, recorded_at)
                VALUES ($1, $2, $3, now())
                "#,
            )
            .bind(Uuid::now_v7())
            .bind(source_id)
            .bind(price)
            .execute(pool)
            .await?;
            tracing::info!(%source_id, price, "recorded import-batch price from transfer amount");
            price
        }
    };

    Ok(Some((source_id, price)))
}

/// Append a balance-affecting entry for the source. Entries are additive and
/// attributable to a (source, price, timestamp) triple; the caller invokes
/// this once per successfully reconciled receipt, so at-least-once delivery
/// is accepted rather than deduplicated here.
pub async fn update_payment_supply_balance(
    pool: &PgPool,
    source_id: Uuid,
    price: i64,
    at: DateTime<Utc>,
) -> Result<(), PipelineError> {
    sqlx::query(
        r#"
        INSERT INTO supply_balance_entries (id, supply_source_id, price, occurred_at, reason)
        VALUES ($1, $2, $3, $4, 'payment')
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(source_id)
    .bind(price)
    .bind(at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn balance_for_source(pool: &PgPool, source_id: Uuid) -> Result<i64, PipelineError> {
    let sum: Option<i64> = sqlx::query_scalar(
        "SELECT SUM(price)::bigint FROM supply_balance_entries WHERE supply_source_id = $1",
    )
    .bind(source_id)
    .fetch_one(pool)
    .await?;
    Ok(sum.unwrap_or(0))
}
