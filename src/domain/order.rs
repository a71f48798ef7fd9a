use {
    super::error::PipelineError,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Unpaid,
    Paid,
    Suspended,
    Closed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
            Self::Suspended => "suspended",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unpaid" => Ok(Self::Unpaid),
            "paid" => Ok(Self::Paid),
            "suspended" => Ok(Self::Suspended),
            "closed" => Ok(Self::Closed),
            other => Err(PipelineError::Validation(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

/// Snapshot of the order fields the renewal machine reads. Fetched fresh at
/// evaluation time; never cached across requests.
#[derive(Debug, Clone)]
pub struct OrderState {
    pub id: Uuid,
    pub order_code: String,
    pub status: OrderStatus,
    /// Tri-state: None = never evaluated, Some(false) = evaluated-not-due,
    /// Some(true) = due or operator-forced.
    pub check_flag: Option<bool>,
    pub expired_at: DateTime<Utc>,
    pub period_months: i32,
    pub supply_source_id: Option<Uuid>,
}

impl OrderState {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expired_at <= now
    }
}

/// A stale "paid" marker found during a reconciliation pass should not
/// survive the pass silently.
pub fn should_reset_status_to_unpaid(status: OrderStatus) -> bool {
    status == OrderStatus::Paid
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligibility {
    pub eligible: bool,
    pub force_renewal: bool,
    pub needs_status_reset: bool,
    pub status: OrderStatus,
}

/// Computed transition decision. No state column stores this — the decision
/// is derived from status, check flag and expiry on every pass.
pub fn evaluate(status: OrderStatus, check_flag: Option<bool>, expired: bool) -> Eligibility {
    let flag_allows = check_flag.unwrap_or(true);
    Eligibility {
        eligible: status == OrderStatus::Unpaid && flag_allows && expired,
        force_renewal: status == OrderStatus::Unpaid && check_flag == Some(true) && expired,
        needs_status_reset: should_reset_status_to_unpaid(status),
        status,
    }
}

impl Eligibility {
    /// Unpaid order with an unset flag that isn't due yet: park it by
    /// marking the flag false instead of attempting renewal.
    pub fn should_park(&self, check_flag: Option<bool>) -> bool {
        !self.eligible && self.status == OrderStatus::Unpaid && check_flag.is_none()
    }
}
