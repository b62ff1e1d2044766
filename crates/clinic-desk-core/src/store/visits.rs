//! Visit records.

use std::collections::BTreeMap;

use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use uuid::Uuid;

use super::{parse_timestamp, LocalStore, StoreError, StoreResult};
use crate::api::VisitQuery;
use crate::models::{
    Department, Listing, NewVisit, RoutedTo, Visit, VisitStatus, Vitals,
};

const VISIT_COLUMNS: &str = r#"
    v.id, v.patient_id, p.full_name, v.doctor_id, d.username,
    v.assigned_role, v.status, v.vitals, v.diagnosis, v.prescription, v.created_at
"#;

const VISIT_JOINS: &str = r#"
    FROM visits v
    JOIN patients p ON p.id = v.patient_id
    LEFT JOIN doctors d ON d.id = v.doctor_id
"#;

fn json_column<T: serde::de::DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn visit_from_row(row: &Row<'_>) -> rusqlite::Result<Visit> {
    let role: String = row.get(5)?;
    let status: String = row.get(6)?;
    let vitals: String = row.get(7)?;
    let prescription: Option<String> = row.get(9)?;

    Ok(Visit {
        id: row.get(0)?,
        patient: row.get(1)?,
        patient_name: row.get(2)?,
        doctor: row.get(3)?,
        doctor_name: row.get(4)?,
        assigned_role: match Department::parse(&role) {
            Some(department) => RoutedTo::Department(department),
            None => RoutedTo::Elsewhere(role),
        },
        status: VisitStatus::parse(&status),
        vitals: json_column::<Vitals>(7, &vitals)?,
        diagnosis: row.get(8)?,
        prescription: prescription
            .map(|raw| json_column::<BTreeMap<String, String>>(9, &raw))
            .transpose()?,
        created_at: parse_timestamp(10, row.get(10)?)?,
    })
}

impl LocalStore {
    /// Get a visit by ID.
    pub fn get_visit(&self, id: &str) -> StoreResult<Option<Visit>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} {} WHERE v.id = ?", VISIT_COLUMNS, VISIT_JOINS);
        conn.query_row(&sql, [id], visit_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// Open a visit with status OPEN.
    pub fn insert_visit(&self, visit: &NewVisit) -> StoreResult<Visit> {
        if self.get_patient(&visit.patient_id)?.is_none() {
            return Err(StoreError::Invalid(format!(
                "unknown patient {}",
                visit.patient_id
            )));
        }

        let id = Uuid::new_v4().to_string();
        let (_, created_at) = self.timestamp();
        self.conn()?.execute(
            r#"
            INSERT INTO visits (id, patient_id, doctor_id, assigned_role, status, vitals, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                id,
                visit.patient_id,
                visit.assignment.doctor_id(),
                visit.assignment.department().as_str(),
                VisitStatus::Open.as_str(),
                serde_json::to_string(&visit.vitals)?,
                created_at,
            ],
        )?;

        self.get_visit(&id)?
            .ok_or_else(|| StoreError::NotFound(format!("visit {}", id)))
    }

    /// Move a visit to another status.
    pub fn set_visit_status(&self, id: &str, status: VisitStatus) -> StoreResult<()> {
        let rows = self.conn()?.execute(
            "UPDATE visits SET status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("visit {}", id)));
        }
        Ok(())
    }

    /// Record the consultation outcome of a visit.
    pub fn record_consultation(
        &self,
        id: &str,
        diagnosis: &str,
        prescription: &BTreeMap<String, String>,
    ) -> StoreResult<()> {
        let rows = self.conn()?.execute(
            "UPDATE visits SET diagnosis = ?2, prescription = ?3 WHERE id = ?1",
            params![id, diagnosis, serde_json::to_string(prescription)?],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("visit {}", id)));
        }
        Ok(())
    }

    /// List visits matching `query`, newest first.
    pub fn list_visits(&self, query: &VisitQuery) -> StoreResult<Listing<Visit>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(patient) = &query.patient {
            clauses.push("v.patient_id = ?".into());
            args.push(patient.clone());
        }
        if !query.statuses.is_empty() {
            let marks = vec!["?"; query.statuses.len()].join(", ");
            clauses.push(format!("v.status IN ({})", marks));
            args.extend(query.statuses.iter().map(|s| s.as_str().to_string()));
        }

        let filter = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let conn = self.conn()?;
        let count: u64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM visits v {}", filter),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        let limit = query
            .limit
            .map(|n| format!("LIMIT {}", n))
            .unwrap_or_default();
        let sql = format!(
            "SELECT {} {} {} ORDER BY v.created_at DESC, v.rowid DESC {}",
            VISIT_COLUMNS, VISIT_JOINS, filter, limit
        );
        let mut stmt = conn.prepare(&sql)?;
        let visits = stmt
            .query_map(params_from_iter(args.iter()), visit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Listing::new(visits, Some(count)))
    }
}
