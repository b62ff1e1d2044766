//! Staff directory models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

fn active_by_default() -> bool {
    true
}

/// A doctor eligible for visit assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    /// Staff UUID
    pub id: String,
    /// Login name
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Consultation fee charged per visit
    #[serde(default)]
    pub consultation_fee: Option<Decimal>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}
