//! Data API boundary.
//!
//! Every read and write the desk performs goes through [`ClinicApi`]. [`HttpApi`] talks to the
//! clinic server; [`crate::store::LocalStore`] serves the same contract from SQLite.

mod http;

pub use http::HttpApi;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{
    Doctor, Invoice, Listing, NewPatient, NewVisit, Patient, Registration, Visit, VisitStatus,
};

/// Data API errors.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response decode error: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Store error: {0}")]
    Store(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Filters for the patient list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientQuery {
    pub page: Option<u32>,
    /// Name or phone substring
    pub search: Option<String>,
    /// Registration date (UTC)
    pub created_on: Option<NaiveDate>,
}

impl PatientQuery {
    /// One page of the directory.
    pub fn page(page: u32, search: &str) -> Self {
        let search = search.trim();
        Self {
            page: Some(page),
            search: (!search.is_empty()).then(|| search.to_string()),
            created_on: None,
        }
    }

    /// Patients registered on `day`.
    pub fn registered_on(day: NaiveDate) -> Self {
        Self {
            created_on: Some(day),
            ..Default::default()
        }
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(search) = &self.search {
            params.push(("search", search.clone()));
        }
        if let Some(day) = self.created_on {
            params.push(("created_at__date", day.format("%Y-%m-%d").to_string()));
        }
        params
    }
}

/// Filters for the visit list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisitQuery {
    pub patient: Option<String>,
    /// Any of these statuses; empty means all
    pub statuses: Vec<VisitStatus>,
    pub newest_first: bool,
    pub limit: Option<u32>,
}

impl VisitQuery {
    pub fn for_patient(patient_id: &str) -> Self {
        Self {
            patient: Some(patient_id.to_string()),
            ..Default::default()
        }
    }

    /// Open and in-progress visits.
    pub fn active() -> Self {
        Self {
            statuses: vec![VisitStatus::Open, VisitStatus::InProgress],
            ..Default::default()
        }
    }

    pub fn recent(limit: u32) -> Self {
        Self {
            newest_first: true,
            limit: Some(limit),
            ..Default::default()
        }
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(patient) = &self.patient {
            params.push(("patient", patient.clone()));
        }
        if !self.statuses.is_empty() {
            let statuses: Vec<&str> = self.statuses.iter().map(|s| s.as_str()).collect();
            params.push(("status__in", statuses.join(",")));
        }
        if self.newest_first {
            params.push(("ordering", "-created_at".into()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

/// Filters for the invoice list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceQuery {
    pub patient: Option<String>,
    pub created_on: Option<NaiveDate>,
}

impl InvoiceQuery {
    pub fn for_patient(patient_id: &str) -> Self {
        Self {
            patient: Some(patient_id.to_string()),
            created_on: None,
        }
    }

    pub fn created_on(day: NaiveDate) -> Self {
        Self {
            patient: None,
            created_on: Some(day),
        }
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(patient) = &self.patient {
            params.push(("visit__patient", patient.clone()));
        }
        if let Some(day) = self.created_on {
            params.push(("created_at__date", day.format("%Y-%m-%d").to_string()));
        }
        params
    }
}

/// Operations the desk consumes from the clinic data API.
#[async_trait]
pub trait ClinicApi: Send + Sync {
    async fn list_patients(&self, query: &PatientQuery) -> ApiResult<Listing<Patient>>;

    /// Create a patient, or return the existing one with the same phone number.
    async fn register_patient(&self, patient: &NewPatient) -> ApiResult<Registration>;

    async fn list_visits(&self, query: &VisitQuery) -> ApiResult<Listing<Visit>>;

    async fn create_visit(&self, visit: &NewVisit) -> ApiResult<Visit>;

    /// Active staff with the doctor role.
    async fn list_doctors(&self) -> ApiResult<Vec<Doctor>>;

    async fn list_invoices(&self, query: &InvoiceQuery) -> ApiResult<Listing<Invoice>>;

    /// Partial update setting the invoice to PAID.
    async fn mark_invoice_paid(&self, invoice_id: &str) -> ApiResult<Invoice>;
}

#[async_trait]
impl<T: ClinicApi + ?Sized> ClinicApi for Arc<T> {
    async fn list_patients(&self, query: &PatientQuery) -> ApiResult<Listing<Patient>> {
        (**self).list_patients(query).await
    }

    async fn register_patient(&self, patient: &NewPatient) -> ApiResult<Registration> {
        (**self).register_patient(patient).await
    }

    async fn list_visits(&self, query: &VisitQuery) -> ApiResult<Listing<Visit>> {
        (**self).list_visits(query).await
    }

    async fn create_visit(&self, visit: &NewVisit) -> ApiResult<Visit> {
        (**self).create_visit(visit).await
    }

    async fn list_doctors(&self) -> ApiResult<Vec<Doctor>> {
        (**self).list_doctors().await
    }

    async fn list_invoices(&self, query: &InvoiceQuery) -> ApiResult<Listing<Invoice>> {
        (**self).list_invoices(query).await
    }

    async fn mark_invoice_paid(&self, invoice_id: &str) -> ApiResult<Invoice> {
        (**self).mark_invoice_paid(invoice_id).await
    }
}
