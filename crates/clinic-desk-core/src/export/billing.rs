//! Billing statement export for one patient.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::escape_csv;
use crate::models::{Invoice, PaymentStatus};

const HEADER: &str = "invoice_id,visit_id,created_at,items,total_amount,payment_status\n";

/// Single invoice line of a statement.
#[derive(Debug, Clone, Serialize)]
pub struct StatementLine {
    pub invoice_id: String,
    pub visit_id: Option<String>,
    pub created_at: String,
    pub items: usize,
    pub total_amount: Decimal,
    pub payment_status: &'static str,
}

/// A patient's invoices with paid and outstanding totals.
#[derive(Debug, Clone, Serialize)]
pub struct BillingStatement {
    pub patient_id: String,
    pub patient_name: String,
    pub exported_at: DateTime<Utc>,
    pub lines: Vec<StatementLine>,
    pub total_paid: Decimal,
    pub total_outstanding: Decimal,
}

impl BillingStatement {
    pub fn new(
        patient_id: &str,
        patient_name: &str,
        invoices: &[Invoice],
        exported_at: DateTime<Utc>,
    ) -> Self {
        let mut total_paid = Decimal::ZERO;
        let mut total_outstanding = Decimal::ZERO;

        let lines = invoices
            .iter()
            .map(|invoice| {
                match invoice.payment_status {
                    PaymentStatus::Paid => total_paid += invoice.total_amount,
                    PaymentStatus::Pending => total_outstanding += invoice.total_amount,
                }
                StatementLine {
                    invoice_id: invoice.id.clone(),
                    visit_id: invoice.visit.clone(),
                    created_at: invoice.created_at.to_rfc3339(),
                    items: invoice.item_count,
                    total_amount: invoice.total_amount,
                    payment_status: invoice.payment_status.as_str(),
                }
            })
            .collect();

        Self {
            patient_id: patient_id.to_string(),
            patient_name: patient_name.to_string(),
            exported_at,
            lines,
            total_paid,
            total_outstanding,
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format. Totals are not part of the CSV.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from(HEADER);

        for line in &self.lines {
            csv.push_str(&format!(
                "{},{},{},{},{},{}\n",
                escape_csv(&line.invoice_id),
                line.visit_id.as_deref().map(escape_csv).unwrap_or_default(),
                line.created_at,
                line.items,
                line.total_amount,
                line.payment_status,
            ));
        }

        csv
    }
}
