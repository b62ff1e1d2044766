//! Dashboard statistics.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use super::{Invoice, PaymentStatus, Visit};

/// Most recent visits shown on the dashboard.
pub const RECENT_VISIT_LIMIT: usize = 5;

/// Last known dashboard figures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsSnapshot {
    /// Patients registered today
    pub new_patients_today: u64,
    /// Open or in-progress visits
    pub active_visits: u64,
    /// Paid invoice total for today
    pub today_revenue: Decimal,
    /// Newest visits first, at most [`RECENT_VISIT_LIMIT`]
    pub recent_visits: Vec<Visit>,
    /// When any figure was last updated
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Sum of paid invoices created on `day` (UTC).
pub fn paid_revenue_on(invoices: &[Invoice], day: NaiveDate) -> Decimal {
    invoices
        .iter()
        .filter(|inv| inv.payment_status == PaymentStatus::Paid)
        .filter(|inv| inv.created_at.date_naive() == day)
        .map(|inv| inv.total_amount)
        .sum()
}

/// Newest visits first, truncated to [`RECENT_VISIT_LIMIT`].
pub fn recent_visits(mut visits: Vec<Visit>) -> Vec<Visit> {
    visits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    visits.truncate(RECENT_VISIT_LIMIT);
    visits
}
