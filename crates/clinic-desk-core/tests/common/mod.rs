//! Shared fixtures: a local store behind a failure-injecting wrapper.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use clinic_desk_core::api::{ApiError, ApiResult, ClinicApi, InvoiceQuery, PatientQuery, VisitQuery};
use clinic_desk_core::models::{
    Doctor, Gender, Invoice, Listing, NewPatient, NewVisit, Patient, Registration, Visit,
};
use clinic_desk_core::validation::PatientDraft;
use clinic_desk_core::LocalStore;

/// Operations a [`FlakyApi`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListPatients,
    RegisterPatient,
    ListVisits,
    CreateVisit,
    ListDoctors,
    ListInvoices,
    MarkPaid,
}

/// Wraps a [`LocalStore`] the way a flaky network wraps the clinic server.
pub struct FlakyApi {
    store: Arc<LocalStore>,
    failures: Mutex<HashMap<Op, u32>>,
    calls: Mutex<HashMap<Op, usize>>,
    patient_delays: Mutex<VecDeque<Duration>>,
}

impl FlakyApi {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self {
            store,
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            patient_delays: Mutex::new(VecDeque::new()),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Fail every call to `op` until healed.
    pub fn fail(&self, op: Op) {
        self.failures.lock().unwrap().insert(op, u32::MAX);
    }

    /// Fail the next `times` calls to `op`.
    pub fn fail_times(&self, op: Op, times: u32) {
        self.failures.lock().unwrap().insert(op, times);
    }

    pub fn heal(&self, op: Op) {
        self.failures.lock().unwrap().remove(&op);
    }

    pub fn heal_all(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn calls(&self, op: Op) -> usize {
        self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    /// Hold the response of the next patient-list call for `delay`. The rows are read when the
    /// call is made, so a delayed response is stale by the time it lands.
    pub fn delay_next_patients(&self, delay: Duration) {
        self.patient_delays.lock().unwrap().push_back(delay);
    }

    fn enter(&self, op: Op) -> ApiResult<()> {
        *self.calls.lock().unwrap().entry(op).or_insert(0) += 1;

        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(&op) {
            Some(remaining) if *remaining > 0 => {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
                Err(ApiError::Transport(format!("{:?}: connection reset", op)))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ClinicApi for FlakyApi {
    async fn list_patients(&self, query: &PatientQuery) -> ApiResult<Listing<Patient>> {
        self.enter(Op::ListPatients)?;
        let listing = ClinicApi::list_patients(self.store.as_ref(), query).await;
        let delay = self.patient_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        listing
    }

    async fn register_patient(&self, patient: &NewPatient) -> ApiResult<Registration> {
        self.enter(Op::RegisterPatient)?;
        self.store.register_patient(patient).await
    }

    async fn list_visits(&self, query: &VisitQuery) -> ApiResult<Listing<Visit>> {
        self.enter(Op::ListVisits)?;
        ClinicApi::list_visits(self.store.as_ref(), query).await
    }

    async fn create_visit(&self, visit: &NewVisit) -> ApiResult<Visit> {
        self.enter(Op::CreateVisit)?;
        self.store.create_visit(visit).await
    }

    async fn list_doctors(&self) -> ApiResult<Vec<Doctor>> {
        self.enter(Op::ListDoctors)?;
        self.store.list_doctors().await
    }

    async fn list_invoices(&self, query: &InvoiceQuery) -> ApiResult<Listing<Invoice>> {
        self.enter(Op::ListInvoices)?;
        ClinicApi::list_invoices(self.store.as_ref(), query).await
    }

    async fn mark_invoice_paid(&self, invoice_id: &str) -> ApiResult<Invoice> {
        self.enter(Op::MarkPaid)?;
        self.store.mark_invoice_paid(invoice_id).await
    }
}

/// A fresh in-memory store behind a healthy [`FlakyApi`].
pub fn flaky_store() -> (Arc<LocalStore>, Arc<FlakyApi>) {
    let store = Arc::new(LocalStore::open_in_memory().unwrap());
    let api = Arc::new(FlakyApi::new(store.clone()));
    (store, api)
}

pub fn new_patient(name: &str, phone: &str) -> NewPatient {
    NewPatient {
        full_name: name.to_string(),
        age: 38.0,
        gender: Gender::Female,
        phone: phone.to_string(),
        address: "12 Station Road".to_string(),
    }
}

pub fn draft(name: &str, age: &str, phone: &str) -> PatientDraft {
    PatientDraft {
        full_name: name.to_string(),
        age: age.to_string(),
        gender: Gender::Male,
        phone: phone.to_string(),
        address: "12 Station Road".to_string(),
    }
}

/// Register `count` patients with phones 9100000000, 9100000001, ...
pub fn seed_patients(store: &LocalStore, count: usize) -> Vec<Patient> {
    (0..count)
        .map(|i| {
            store
                .register(&new_patient(&format!("Patient {:03}", i), &format!("91{:08}", i)))
                .unwrap()
                .patient()
                .clone()
        })
        .collect()
}
