//! Patient records.

use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use uuid::Uuid;

use super::{like_pattern, parse_timestamp, LocalStore, StoreError, StoreResult};
use crate::api::PatientQuery;
use crate::models::{DoctorRef, Gender, Listing, NewPatient, Patient, Registration, PAGE_SIZE};

const PATIENT_COLUMNS: &str = r#"
    p.id, p.full_name, p.age, p.gender, p.phone, p.address, p.id_proof, p.created_at,
    (SELECT COUNT(*) FROM visits v WHERE v.patient_id = p.id) AS total_visits,
    (SELECT d.id FROM visits v JOIN doctors d ON d.id = v.doctor_id
        WHERE v.patient_id = p.id ORDER BY v.created_at DESC LIMIT 1) AS last_doctor_id,
    (SELECT d.username FROM visits v JOIN doctors d ON d.id = v.doctor_id
        WHERE v.patient_id = p.id ORDER BY v.created_at DESC LIMIT 1) AS last_doctor_name
"#;

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    let gender: String = row.get(3)?;
    let last_doctor_id: Option<String> = row.get(9)?;
    let last_doctor_name: Option<String> = row.get(10)?;

    Ok(Patient {
        id: row.get(0)?,
        full_name: row.get(1)?,
        age: row.get(2)?,
        gender: Gender::from_code(&gender).unwrap_or(Gender::Other),
        phone: row.get(4)?,
        address: row.get(5)?,
        id_proof: row.get(6)?,
        created_at: Some(parse_timestamp(7, row.get(7)?)?),
        total_visits: row.get(8)?,
        last_consulted_doctor: last_doctor_id
            .zip(last_doctor_name)
            .map(|(id, name)| DoctorRef { id, name }),
    })
}

/// Server-side checks applied on top of the desk's own form validation.
fn check_new_patient(patient: &NewPatient) -> StoreResult<u32> {
    if patient.full_name.trim().is_empty() || patient.address.trim().is_empty() {
        return Err(StoreError::Invalid("name and address are required".into()));
    }
    if patient.phone.len() != 10 || !patient.phone.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StoreError::Invalid(format!(
            "phone '{}' is not a 10 digit number",
            patient.phone
        )));
    }
    if patient.age.fract() != 0.0 || patient.age < 1.0 || patient.age > u32::MAX as f64 {
        return Err(StoreError::Invalid(format!(
            "age {} is not a whole number of years",
            patient.age
        )));
    }
    Ok(patient.age as u32)
}

impl LocalStore {
    /// Get a patient by ID.
    pub fn get_patient(&self, id: &str) -> StoreResult<Option<Patient>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM patients p WHERE p.id = ?", PATIENT_COLUMNS);
        conn.query_row(&sql, [id], patient_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// Get a patient by phone number.
    pub fn find_patient_by_phone(&self, phone: &str) -> StoreResult<Option<Patient>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM patients p WHERE p.phone = ?", PATIENT_COLUMNS);
        conn.query_row(&sql, [phone], patient_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// Register a patient. An existing phone number returns the stored patient unchanged.
    pub fn register(&self, patient: &NewPatient) -> StoreResult<Registration> {
        let age = check_new_patient(patient)?;

        if let Some(existing) = self.find_patient_by_phone(&patient.phone)? {
            tracing::debug!(patient_id = %existing.id, "phone already registered");
            return Ok(Registration::AlreadyExists(existing));
        }

        let id = Uuid::new_v4().to_string();
        let (_, created_at) = self.timestamp();
        self.conn()?.execute(
            r#"
            INSERT INTO patients (id, full_name, age, gender, phone, address, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                id,
                patient.full_name.trim(),
                age,
                patient.gender.code(),
                patient.phone,
                patient.address.trim(),
                created_at,
            ],
        )?;

        let created = self
            .get_patient(&id)?
            .ok_or_else(|| StoreError::NotFound(format!("patient {}", id)))?;
        Ok(Registration::Created(created))
    }

    /// List patients, newest first, a page of [`PAGE_SIZE`] at a time.
    pub fn list_patients(&self, query: &PatientQuery) -> StoreResult<Listing<Patient>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            clauses.push(r"(p.full_name LIKE ? ESCAPE '\' OR p.phone LIKE ? ESCAPE '\')");
            let pattern = like_pattern(search.trim());
            args.push(pattern.clone());
            args.push(pattern);
        }
        if let Some(day) = query.created_on {
            clauses.push("substr(p.created_at, 1, 10) = ?");
            args.push(day.format("%Y-%m-%d").to_string());
        }

        let filter = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let conn = self.conn()?;
        let count: u64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM patients p {}", filter),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        let page = query.page.unwrap_or(1).max(1);
        let offset = u64::from(page - 1) * u64::from(PAGE_SIZE);
        if page > 1 && offset >= count {
            return Err(StoreError::NotFound("Invalid page.".into()));
        }

        let sql = format!(
            "SELECT {} FROM patients p {} ORDER BY p.created_at DESC, p.rowid DESC LIMIT {} OFFSET {}",
            PATIENT_COLUMNS, filter, PAGE_SIZE, offset
        );
        let mut stmt = conn.prepare(&sql)?;
        let patients = stmt
            .query_map(params_from_iter(args.iter()), patient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Listing::new(patients, Some(count)))
    }

    /// Count all registered patients.
    pub fn patient_count(&self) -> StoreResult<u64> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?)
    }
}
