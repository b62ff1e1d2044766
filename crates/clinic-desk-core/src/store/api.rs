//! [`ClinicApi`] served from the local store.

use async_trait::async_trait;

use super::LocalStore;
use crate::api::{ApiResult, ClinicApi, InvoiceQuery, PatientQuery, VisitQuery};
use crate::models::{
    Doctor, Invoice, Listing, NewPatient, NewVisit, Patient, PaymentStatus, Registration, Visit,
};

#[async_trait]
impl ClinicApi for LocalStore {
    async fn list_patients(&self, query: &PatientQuery) -> ApiResult<Listing<Patient>> {
        Ok(LocalStore::list_patients(self, query)?)
    }

    async fn register_patient(&self, patient: &NewPatient) -> ApiResult<Registration> {
        Ok(self.register(patient)?)
    }

    async fn list_visits(&self, query: &VisitQuery) -> ApiResult<Listing<Visit>> {
        Ok(LocalStore::list_visits(self, query)?)
    }

    async fn create_visit(&self, visit: &NewVisit) -> ApiResult<Visit> {
        Ok(self.insert_visit(visit)?)
    }

    async fn list_doctors(&self) -> ApiResult<Vec<Doctor>> {
        Ok(self.active_doctors()?)
    }

    async fn list_invoices(&self, query: &InvoiceQuery) -> ApiResult<Listing<Invoice>> {
        Ok(LocalStore::list_invoices(self, query)?)
    }

    async fn mark_invoice_paid(&self, invoice_id: &str) -> ApiResult<Invoice> {
        Ok(self.set_payment_status(invoice_id, PaymentStatus::Paid)?)
    }
}
