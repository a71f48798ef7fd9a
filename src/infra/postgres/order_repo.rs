use {
    crate::domain::{
        error::PipelineError,
        order::{OrderState, OrderStatus},
    },
    chrono::{DateTime, Utc},
    sqlx::{PgPool, Row, postgres::PgRow},
    uuid::Uuid,
};

fn order_state_from_row(row: PgRow) -> Result<OrderState, PipelineError> {
    let status_str: String = row.try_get("status")?;
    Ok(OrderState {
        id: row.try_get("id")?,
        order_code: row.try_get("order_code")?,
        status: OrderStatus::try_from(status_str.as_str())?,
        check_flag: row.try_get("check_flag")?,
        expired_at: row.try_get("expired_at")?,
        period_months: row.try_get("period_months")?,
        supply_source_id: row.try_get("supply_source_id")?,
    })
}

pub async fn fetch_order_state(
    pool: &PgPool,
    order_code: &str,
) -> Result<Option<OrderState>, PipelineError> {
    let row = sqlx::query(
        r#"
        SELECT id, order_code, status, check_flag, expired_at, period_months, supply_source_id
        FROM orders WHERE order_code = $1
        "#,
    )
    .bind(order_code)
    .fetch_optional(pool)
    .await?;

    row.map(order_state_from_row).transpose()
}

/// Order codes for the implicit batch sweep: every currently-expired unpaid
/// order. Parked orders (flag false) are included so they surface in the
/// batch summary and are reachable by a forced sweep.
pub async fn expired_unpaid_codes(
    pool: &PgPool,
    now: DateTime<Utc>,
) -> Result<Vec<String>, PipelineError> {
    let codes: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT order_code FROM orders
        WHERE status = 'unpaid'
          AND expired_at <= $1
        ORDER BY expired_at
        "#,
    )
    .bind(now)
    .fetch_all(pool)
    .await?;
    Ok(codes)
}

pub async fn set_status_unpaid(pool: &PgPool, order_code: &str) -> Result<bool, PipelineError> {
    let result = sqlx::query("UPDATE orders SET status = 'unpaid', updated_at = now() WHERE order_code = $1")
        .bind(order_code)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn mark_check_flag_false(pool: &PgPool, order_code: &str) -> Result<bool, PipelineError> {
    let result = sqlx::query("UPDATE orders SET check_flag = false, updated_at = now() WHERE order_code = $1")
        .bind(order_code)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(Debug)]
pub enum RenewalTxResult {
    Renewed(DateTime<Utc>),
    /// Eligibility re-check under the lock failed — another delivery got
    /// there first, or the order's state changed since evaluation.
    NotRenewable,
    Missing,
}

/// Extend the order by one billing period and clear the check flag, and
/// append the renewal to the supply balance ledger, all in one transaction
/// guarded by an advisory lock on the order code. Either both land or
/// neither does. Eligibility is re-checked inside the lock so a delivery
/// that evaluated against stale state cannot extend twice; `force` (the
/// operator override) bypasses the flag and expiry checks but never the
/// unpaid-status check.
pub async fn run_renewal_tx(
    pool: &PgPool,
    order_code: &str,
    force: bool,
    now: DateTime<Utc>,
) -> Result<RenewalTxResult, PipelineError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SET LOCAL lock_timeout = '5s'")
        .execute(&mut *tx)
        .await?;

    // Serialize renewal per order code across all app instances.
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(order_code)
        .execute(&mut *tx)
        .await?;

    let row = sqlx::query(
        r#"
        UPDATE orders
        SET expired_at = expired_at + make_interval(months => period_months),
            check_flag = false,
            updated_at = now()
        WHERE order_code = $1
          AND status = 'unpaid'
          AND (check_flag IS NULL OR check_flag = true OR $2)
          AND ($2 OR expired_at <= $3)
        RETURNING expired_at, supply_source_id
        "#,
    )
    .bind(order_code)
    .bind(force)
    .bind(now)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row else {
        let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM orders WHERE order_code = $1")
            .bind(order_code)
            .fetch_optional(&mut *tx)
            .await?;
        tx.rollback().await?;
        return Ok(match exists {
            Some(_) => RenewalTxResult::NotRenewable,
            None => RenewalTxResult::Missing,
        });
    };

    let new_expiry: DateTime<Utc> = row.try_get("expired_at")?;
    let source_id: Option<Uuid> = row.try_get("supply_source_id")?;

    if let Some(source_id) = source_id {
        let price: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT price FROM supply_prices
            WHERE supply_source_id = $1
            ORDER BY recorded_at DESC
            LIMIT 1
            "#,
        )
        .bind(source_id)
        .fetch_optional(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO supply_balance_entries (id, supply_source_id, price, occurred_at, reason)
            VALUES ($1, $2, $3, $4, 'renewal')
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(source_id)
        .bind(price.unwrap_or(0))
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(RenewalTxResult::Renewed(new_expiry))
}
