use {
    super::money::Amount,
    chrono::{DateTime, NaiveDateTime, Utc},
    serde::Serialize,
};

/// Canonical form of one inbound bank-transfer notification. The gateway has
/// shipped at least two payload generations with different field names, so
/// normalization walks an ordered alias list per field and takes the first
/// non-empty match.
#[derive(Debug, Clone, Serialize)]
pub struct BankTransaction {
    pub reference_id: String,
    pub amount: Amount,
    pub narrative: String,
    pub sender: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub raw: serde_json::Value,
}

const AMOUNT_FIELDS: &[&str] = &["transferAmount", "amount_in", "amount"];
const NARRATIVE_FIELDS: &[&str] = &["content", "transaction_content", "description"];
const REFERENCE_FIELDS: &[&str] = &["referenceCode", "reference_number", "id"];
const SENDER_FIELDS: &[&str] = &["accountNumber", "account_number", "sender"];
const DATE_FIELDS: &[&str] = &["transactionDate", "transaction_date"];

fn first_string(raw: &serde_json::Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|f| match raw.get(f) {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn first_amount(raw: &serde_json::Value, fields: &[&str]) -> Option<Amount> {
    fields.iter().find_map(|f| raw.get(f).and_then(Amount::from_json))
}

fn parse_paid_at(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Legacy gateway format: "2024-01-31 14:05:00", no zone, treated as UTC.
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

impl BankTransaction {
    /// Map a raw gateway payload into the canonical record. Returns `None`
    /// when no usable transaction is present (no amount and no narrative).
    pub fn normalize(raw: &serde_json::Value) -> Option<BankTransaction> {
        if !raw.is_object() {
            return None;
        }

        let amount = first_amount(raw, AMOUNT_FIELDS);
        let narrative = first_string(raw, NARRATIVE_FIELDS);
        if amount.is_none() && narrative.is_none() {
            return None;
        }

        let narrative = narrative.unwrap_or_default();
        let reference_id = first_string(raw, REFERENCE_FIELDS)?;
        let paid_at = first_string(raw, DATE_FIELDS)
            .and_then(|s| parse_paid_at(&s))
            .unwrap_or_else(Utc::now);

        Some(BankTransaction {
            reference_id,
            amount: amount.unwrap_or(Amount::ZERO),
            narrative,
            sender: first_string(raw, SENDER_FIELDS),
            paid_at,
            raw: raw.clone(),
        })
    }

    /// Scan the free-text narrative for the order code it settles: the first
    /// `DH`-prefixed run of four or more alphanumerics, uppercased. The scan
    /// is purely positional, so the same narrative always yields the same
    /// code or consistently none.
    pub fn derive_order_code(&self) -> Option<String> {
        derive_order_code(&self.narrative)
    }
}

pub fn derive_order_code(narrative: &str) -> Option<String> {
    let bytes = narrative.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        let prefixed = bytes[i].eq_ignore_ascii_case(&b'D') && bytes[i + 1].eq_ignore_ascii_case(&b'H');
        // Must start a token: preceding char can't be alphanumeric.
        let starts_token = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
        if prefixed && starts_token {
            let mut end = i + 2;
            while end < bytes.len() && bytes[end].is_ascii_alphanumeric() {
                end += 1;
            }
            if end - (i + 2) >= 4 {
                return Some(narrative[i..end].to_ascii_uppercase());
            }
        }
        i += 1;
    }
    None
}
