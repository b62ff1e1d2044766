//! Invoice records.

use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{parse_decimal, parse_timestamp, LocalStore, StoreError, StoreResult};
use crate::api::InvoiceQuery;
use crate::models::{Invoice, Listing, PaymentStatus};

const INVOICE_COLUMNS: &str = r#"
    i.id, i.visit_id, i.patient_id, p.full_name, i.total_amount, i.payment_status,
    i.item_count, i.created_at
    FROM invoices i
    LEFT JOIN patients p ON p.id = i.patient_id
"#;

fn invoice_from_row(row: &Row<'_>) -> rusqlite::Result<Invoice> {
    let status: String = row.get(5)?;
    let item_count: i64 = row.get(6)?;
    Ok(Invoice {
        id: row.get(0)?,
        visit: row.get(1)?,
        patient_id: row.get(2)?,
        patient_name: row.get(3)?,
        total_amount: parse_decimal(4, row.get(4)?)?,
        payment_status: PaymentStatus::parse(&status).unwrap_or_default(),
        item_count: usize::try_from(item_count).unwrap_or(0),
        created_at: parse_timestamp(7, row.get(7)?)?,
    })
}

impl LocalStore {
    /// Get an invoice by ID.
    pub fn get_invoice(&self, id: &str) -> StoreResult<Option<Invoice>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} WHERE i.id = ?", INVOICE_COLUMNS),
            [id],
            invoice_from_row,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Bill a visit. The invoice starts PENDING.
    pub fn issue_invoice(
        &self,
        visit_id: &str,
        total_amount: Decimal,
        item_count: usize,
    ) -> StoreResult<Invoice> {
        if total_amount.is_sign_negative() {
            return Err(StoreError::Invalid(format!(
                "invoice total {} is negative",
                total_amount
            )));
        }

        let visit = self
            .get_visit(visit_id)?
            .ok_or_else(|| StoreError::NotFound(format!("visit {}", visit_id)))?;

        let id = Uuid::new_v4().to_string();
        let (_, created_at) = self.timestamp();
        self.conn()?.execute(
            r#"
            INSERT INTO invoices (id, visit_id, patient_id, total_amount, payment_status, item_count, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                id,
                visit.id,
                visit.patient,
                total_amount.to_string(),
                PaymentStatus::Pending.as_str(),
                item_count as i64,
                created_at,
            ],
        )?;

        self.get_invoice(&id)?
            .ok_or_else(|| StoreError::NotFound(format!("invoice {}", id)))
    }

    /// Move an invoice forward to `status`. Moving back from PAID is refused.
    pub fn set_payment_status(&self, id: &str, status: PaymentStatus) -> StoreResult<Invoice> {
        let current = self
            .get_invoice(id)?
            .ok_or_else(|| StoreError::NotFound(format!("invoice {}", id)))?;

        let next = current.payment_status.advance(status).ok_or_else(|| {
            StoreError::Invalid(format!(
                "invoice {} cannot move from {} to {}",
                id,
                current.payment_status.as_str(),
                status.as_str()
            ))
        })?;

        self.conn()?.execute(
            "UPDATE invoices SET payment_status = ?2 WHERE id = ?1",
            params![id, next.as_str()],
        )?;
        tracing::debug!(invoice_id = id, status = next.as_str(), "payment status updated");

        self.get_invoice(id)?
            .ok_or_else(|| StoreError::NotFound(format!("invoice {}", id)))
    }

    /// List invoices matching `query`, newest first.
    pub fn list_invoices(&self, query: &InvoiceQuery) -> StoreResult<Listing<Invoice>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(patient) = &query.patient {
            clauses.push("i.patient_id = ?");
            args.push(patient.clone());
        }
        if let Some(day) = query.created_on {
            clauses.push("substr(i.created_at, 1, 10) = ?");
            args.push(day.format("%Y-%m-%d").to_string());
        }

        let filter = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} {} ORDER BY i.created_at DESC, i.rowid DESC",
            INVOICE_COLUMNS, filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let invoices = stmt
            .query_map(params_from_iter(args.iter()), invoice_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let count = invoices.len() as u64;
        Ok(Listing::new(invoices, Some(count)))
    }
}
