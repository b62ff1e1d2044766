//! Patient models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Patient gender as recorded at registration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Gender {
    #[default]
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "O")]
    Other,
}

impl Gender {
    /// Single-letter wire code.
    pub fn code(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Other => "O",
        }
    }

    /// Parse a wire code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "M" => Some(Gender::Male),
            "F" => Some(Gender::Female),
            "O" => Some(Gender::Other),
            _ => None,
        }
    }
}

/// A registered patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Server-assigned UUID
    pub id: String,
    /// Full name
    pub full_name: String,
    /// Age in years
    pub age: u32,
    pub gender: Gender,
    /// Ten-digit phone number, unique per patient
    pub phone: String,
    /// Residential address
    pub address: String,
    /// Identity document reference
    #[serde(default)]
    pub id_proof: Option<String>,
    /// Number of visits on record
    #[serde(default)]
    pub total_visits: u32,
    /// Doctor seen on the most recent doctor visit
    #[serde(default)]
    pub last_consulted_doctor: Option<DoctorRef>,
    /// Registration timestamp
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Short doctor reference embedded in patient rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorRef {
    pub id: String,
    pub name: String,
}

/// Registration request for a new patient.
///
/// Built only from a draft that passed [`crate::validation::validate`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewPatient {
    pub full_name: String,
    pub age: f64,
    pub gender: Gender,
    pub phone: String,
    pub address: String,
}

/// Result of a registration request.
///
/// The server answers an existing phone number with the stored record instead of an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
    Created(Patient),
    AlreadyExists(Patient),
}

impl Registration {
    /// The patient record the server returned.
    pub fn patient(&self) -> &Patient {
        match self {
            Registration::Created(p) | Registration::AlreadyExists(p) => p,
        }
    }
}
