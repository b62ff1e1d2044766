//! Doctor directory.

use rusqlite::{params, Row};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{parse_decimal, LocalStore, StoreResult};
use crate::models::Doctor;

fn doctor_from_row(row: &Row<'_>) -> rusqlite::Result<Doctor> {
    let fee: Option<String> = row.get(3)?;
    Ok(Doctor {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        consultation_fee: fee.map(|raw| parse_decimal(3, raw)).transpose()?,
        is_active: row.get(4)?,
    })
}

impl LocalStore {
    /// Add a doctor to the staff directory.
    pub fn add_doctor(
        &self,
        username: &str,
        email: Option<&str>,
        consultation_fee: Option<Decimal>,
    ) -> StoreResult<Doctor> {
        let doctor = Doctor {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.map(str::to_string),
            consultation_fee,
            is_active: true,
        };

        self.conn()?.execute(
            "INSERT INTO doctors (id, username, email, consultation_fee, is_active) VALUES (?1, ?2, ?3, ?4, 1)",
            params![
                doctor.id,
                doctor.username,
                doctor.email,
                doctor.consultation_fee.map(|fee| fee.to_string()),
            ],
        )?;
        Ok(doctor)
    }

    /// Activate or deactivate a doctor.
    pub fn set_doctor_active(&self, id: &str, active: bool) -> StoreResult<bool> {
        let rows = self.conn()?.execute(
            "UPDATE doctors SET is_active = ?2 WHERE id = ?1",
            params![id, active],
        )?;
        Ok(rows > 0)
    }

    /// Active doctors ordered by username.
    pub fn active_doctors(&self) -> StoreResult<Vec<Doctor>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, username, email, consultation_fee, is_active FROM doctors WHERE is_active = 1 ORDER BY username",
        )?;
        let doctors = stmt
            .query_map([], doctor_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(doctors)
    }
}
