//! Visit models and work-area routing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Work area a visit is routed to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Department {
    #[default]
    Doctor,
    Lab,
    Casualty,
}

impl Department {
    /// Only doctor visits name a specific doctor.
    pub fn requires_doctor(&self) -> bool {
        matches!(self, Department::Doctor)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Doctor => "DOCTOR",
            Department::Lab => "LAB",
            Department::Casualty => "CASUALTY",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DOCTOR" => Some(Department::Doctor),
            "LAB" => Some(Department::Lab),
            "CASUALTY" => Some(Department::Casualty),
            _ => None,
        }
    }

    /// The work area that handles visits for this department.
    pub fn work_area(&self) -> WorkArea {
        match self {
            Department::Doctor => WorkArea::Consultation,
            Department::Lab => WorkArea::Laboratory,
            Department::Casualty => WorkArea::Casualty,
        }
    }
}

/// Staff work areas the desk can hand off to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkArea {
    Consultation,
    Laboratory,
    Casualty,
}

/// Role a stored visit is assigned to.
///
/// Visits created elsewhere may be routed to roles the desk never assigns (pharmacy, billing).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RoutedTo {
    Department(Department),
    Elsewhere(String),
}

impl RoutedTo {
    pub fn department(&self) -> Option<Department> {
        match self {
            RoutedTo::Department(d) => Some(*d),
            RoutedTo::Elsewhere(_) => None,
        }
    }
}

/// Visit lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitStatus {
    Open,
    InProgress,
    Closed,
    /// Statuses this desk does not track
    #[serde(other)]
    Other,
}

impl VisitStatus {
    /// Open and in-progress visits count as active.
    pub fn is_active(&self) -> bool {
        matches!(self, VisitStatus::Open | VisitStatus::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Open => "OPEN",
            VisitStatus::InProgress => "IN_PROGRESS",
            VisitStatus::Closed => "CLOSED",
            VisitStatus::Other => "OTHER",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "OPEN" => VisitStatus::Open,
            "IN_PROGRESS" => VisitStatus::InProgress,
            "CLOSED" => VisitStatus::Closed,
            _ => VisitStatus::Other,
        }
    }
}

/// Free-text vital signs captured at the desk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Vitals {
    /// Body temperature
    #[serde(rename = "temp", default, deserialize_with = "free_text")]
    pub temperature: Option<String>,
    /// Blood pressure
    #[serde(rename = "bp", default, deserialize_with = "free_text")]
    pub blood_pressure: Option<String>,
    #[serde(default, deserialize_with = "free_text")]
    pub pulse: Option<String>,
    #[serde(default, deserialize_with = "free_text")]
    pub weight: Option<String>,
}

/// Accept strings, numbers or null for a free-text vitals field.
fn free_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn vitals_or_empty<'de, D>(deserializer: D) -> Result<Vitals, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vitals>::deserialize(deserializer)?.unwrap_or_default())
}

/// A patient visit as stored by the clinic server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Visit {
    pub id: String,
    /// Patient UUID
    pub patient: String,
    #[serde(default)]
    pub patient_name: Option<String>,
    /// Assigned doctor UUID, present only for doctor visits
    #[serde(default)]
    pub doctor: Option<String>,
    #[serde(default)]
    pub doctor_name: Option<String>,
    pub assigned_role: RoutedTo,
    pub status: VisitStatus,
    #[serde(default, deserialize_with = "vitals_or_empty")]
    pub vitals: Vitals,
    #[serde(default)]
    pub diagnosis: Option<String>,
    /// Medicine name to dosage
    #[serde(default)]
    pub prescription: Option<BTreeMap<String, String>>,
    pub created_at: DateTime<Utc>,
}

/// Where a new visit should go.
///
/// A doctor visit cannot exist without its doctor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    Doctor(String),
    Lab,
    Casualty,
}

impl Assignment {
    pub fn department(&self) -> Department {
        match self {
            Assignment::Doctor(_) => Department::Doctor,
            Assignment::Lab => Department::Lab,
            Assignment::Casualty => Department::Casualty,
        }
    }

    pub fn doctor_id(&self) -> Option<&str> {
        match self {
            Assignment::Doctor(id) => Some(id),
            _ => None,
        }
    }
}

/// Request to open a visit.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVisit {
    pub patient_id: String,
    pub assignment: Assignment,
    pub vitals: Vitals,
}

#[derive(Serialize)]
struct NewVisitBody<'a> {
    patient: &'a str,
    doctor: Option<&'a str>,
    assigned_role: Department,
    status: VisitStatus,
    vitals: &'a Vitals,
}

impl Serialize for NewVisit {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        NewVisitBody {
            patient: &self.patient_id,
            doctor: self.assignment.doctor_id(),
            assigned_role: self.assignment.department(),
            status: VisitStatus::Open,
            vitals: &self.vitals,
        }
        .serialize(serializer)
    }
}
