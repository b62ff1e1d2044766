//! Patient list export.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::escape_csv;
use crate::models::Patient;

const HEADER: &str = "id,full_name,age,gender,phone,created_at\n";

/// One exported patient row.
#[derive(Debug, Clone, Serialize)]
pub struct PatientRow {
    pub id: String,
    pub full_name: String,
    pub age: u32,
    /// Gender code (`M`, `F`, `O`)
    pub gender: &'static str,
    pub phone: String,
    pub created_at: Option<String>,
}

impl From<&Patient> for PatientRow {
    fn from(patient: &Patient) -> Self {
        Self {
            id: patient.id.clone(),
            full_name: patient.full_name.clone(),
            age: patient.age,
            gender: patient.gender.code(),
            phone: patient.phone.clone(),
            created_at: patient.created_at.map(|at| at.to_rfc3339()),
        }
    }
}

/// Export of the patients currently listed.
#[derive(Debug, Clone, Serialize)]
pub struct PatientExport {
    pub exported_at: DateTime<Utc>,
    pub patients: Vec<PatientRow>,
}

impl PatientExport {
    pub fn new(patients: &[Patient], exported_at: DateTime<Utc>) -> Self {
        Self {
            exported_at,
            patients: patients.iter().map(PatientRow::from).collect(),
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from(HEADER);

        for row in &self.patients {
            csv.push_str(&format!(
                "{},{},{},{},{},{}\n",
                escape_csv(&row.id),
                escape_csv(&row.full_name),
                row.age,
                row.gender,
                escape_csv(&row.phone),
                row.created_at.as_deref().unwrap_or(""),
            ));
        }

        csv
    }
}
