//! Invoice models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Payment state of an invoice.
///
/// Payment only ever moves forward: `Pending` to `Paid`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

impl PaymentStatus {
    /// Whether the desk may collect payment.
    pub fn is_collectable(&self) -> bool {
        matches!(self, PaymentStatus::Pending)
    }

    /// Apply a requested transition. Returns `None` for a backwards move.
    pub fn advance(self, to: PaymentStatus) -> Option<PaymentStatus> {
        match (self, to) {
            (PaymentStatus::Paid, PaymentStatus::Pending) => None,
            (_, to) => Some(to),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(PaymentStatus::Pending),
            "PAID" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

/// An invoice as listed by the billing service.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Invoice {
    pub id: String,
    /// Visit UUID the invoice bills for
    #[serde(default)]
    pub visit: Option<String>,
    #[serde(default)]
    pub patient_id: Option<String>,
    /// Display name of the billed patient
    #[serde(default)]
    pub patient_name: Option<String>,
    /// Decimal amount, sent as a string
    pub total_amount: Decimal,
    pub payment_status: PaymentStatus,
    /// Number of line items
    #[serde(rename = "items", default, deserialize_with = "count_items")]
    pub item_count: usize,
    pub created_at: DateTime<Utc>,
}

fn count_items<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let items = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
    Ok(items.map(|items| items.len()).unwrap_or(0))
}

/// Body of the payment collection request.
#[derive(Debug, Serialize)]
pub struct PaymentUpdate {
    pub payment_status: PaymentStatus,
}

impl PaymentUpdate {
    pub fn paid() -> Self {
        Self {
            payment_status: PaymentStatus::Paid,
        }
    }
}
