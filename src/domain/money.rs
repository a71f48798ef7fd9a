use {
    super::error::PipelineError,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Transfer amount in whole currency units. The upstream gateway deals in a
/// zero-decimal currency, so fractional inputs are rounded, never truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(i64);

impl Amount {
    pub fn new(units: i64) -> Result<Self, PipelineError> {
        if units < 0 {
            return Err(PipelineError::Validation(format!(
                "Amount cannot be negative, got: {units}"
            )));
        }
        Ok(Self(units))
    }

    pub const ZERO: Amount = Amount(0);

    /// Coerce a JSON value (number or numeric string) into an amount.
    /// Rounds half-away-from-zero; negative inputs are rejected.
    pub fn from_json(value: &serde_json::Value) -> Option<Amount> {
        let units = match value {
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i
                } else {
                    n.as_f64()?.round() as i64
                }
            }
            serde_json::Value::String(s) => {
                let s = s.trim();
                if let Ok(i) = s.parse::<i64>() {
                    i
                } else {
                    s.parse::<f64>().ok()?.round() as i64
                }
            }
            _ => return None,
        };
        Amount::new(units).ok()
    }

    pub fn units(&self) -> i64 {
        self.0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
