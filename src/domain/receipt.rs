use {
    super::{money::Amount, transaction::BankTransaction},
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

/// Durable record of one settled bank transfer. Insertion is idempotent on
/// `reference_id` — replayed deliveries of the same upstream transaction
/// never produce a second row.
#[derive(Debug, Clone)]
pub struct NewReceipt {
    pub id: Uuid,
    pub reference_id: String,
    pub order_code: Option<String>,
    pub amount: Amount,
    pub sender: Option<String>,
    pub narrative: String,
    pub paid_at: DateTime<Utc>,
    pub raw: serde_json::Value,
}

impl NewReceipt {
    pub fn from_transaction(tx: &BankTransaction) -> Self {
        Self {
            id: Uuid::now_v7(),
            reference_id: tx.reference_id.clone(),
            order_code: tx.derive_order_code(),
            amount: tx.amount,
            sender: tx.sender.clone(),
            narrative: tx.narrative.clone(),
            paid_at: tx.paid_at,
            raw: tx.raw.clone(),
        }
    }
}
